// ABOUTME: Statement parsing and the block-bodied expression forms
// Covers let, assignment (simple, member, index, destructuring), return,
// check, stop, skip, export, import, and the fn/if/for/block forms.

use super::{prec, Parser};
use crate::ast::{
    AssignTarget, Block, ExportName, Expr, Param, Pattern, Stmt,
};
use crate::error::{codes, Error};
use crate::token::{Token, TokenKind};

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, Error> {
        let token = self.cur.clone();
        match &token.kind {
            TokenKind::Let => self.parse_let(token),
            TokenKind::Return => {
                self.advance();
                let value = if self.can_begin_expression_here() {
                    Some(self.parse_expression(prec::LOWEST)?)
                } else {
                    None
                };
                Ok(Stmt::Return { token, value })
            }
            TokenKind::Check => {
                self.advance();
                let condition = self.parse_expression(prec::LOWEST)?;
                self.expect(TokenKind::Else, "`else` in check")?;
                let fallback = self.parse_expression(prec::LOWEST)?;
                Ok(Stmt::Check {
                    token,
                    condition,
                    fallback,
                })
            }
            TokenKind::Stop => {
                self.advance();
                Ok(Stmt::Stop { token })
            }
            TokenKind::Skip => {
                self.advance();
                Ok(Stmt::Skip { token })
            }
            TokenKind::Export => self.parse_export(token),
            TokenKind::Import => self.parse_import(token),
            _ => self.parse_expression_statement(token),
        }
    }

    /// A `return` value must start on the same line as the keyword.
    fn can_begin_expression_here(&self) -> bool {
        self.cur.line == self.last_line
            && super::expressions::can_start_expression(&self.cur.kind)
    }

    fn parse_let(&mut self, token: Token) -> Result<Stmt, Error> {
        self.advance(); // let
        let pattern = self.parse_pattern()?;
        self.expect(TokenKind::Assign, "`=` in let binding")?;
        let value = self.parse_expression(prec::LOWEST)?;
        Ok(Stmt::Let {
            token,
            pattern,
            value,
        })
    }

    fn parse_export(&mut self, token: Token) -> Result<Stmt, Error> {
        self.advance(); // export
        match self.cur.kind.clone() {
            // `export fn name(...) { ... }`
            TokenKind::Fn => {
                let fn_token = self.cur.clone();
                let function = self.parse_function_literal(fn_token)?;
                let Expr::Function { name: Some(ref name), .. } = function else {
                    return Err(self.error_at(
                        &token,
                        codes::PARSE_SYNTAX,
                        "exported functions need a name",
                    ));
                };
                Ok(Stmt::Export {
                    token,
                    name: ExportName::Named(name.clone()),
                    value: function,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                self.expect(TokenKind::Assign, "`=` in export")?;
                let value = self.parse_expression(prec::LOWEST)?;
                let name = if name == "default" {
                    ExportName::Default
                } else {
                    ExportName::Named(name)
                };
                Ok(Stmt::Export { token, name, value })
            }
            _ => Err(self.unexpected("a name or `default` after `export`")),
        }
    }

    fn parse_import(&mut self, token: Token) -> Result<Stmt, Error> {
        self.advance(); // import
        let source = self.parse_expression(prec::EQUALITY)?;
        let alias = if self.eat(TokenKind::As) {
            let (_, name) = self.expect_ident("a name after `as`")?;
            Some(name)
        } else {
            None
        };
        Ok(Stmt::Import {
            token,
            source,
            alias,
        })
    }

    fn parse_expression_statement(&mut self, token: Token) -> Result<Stmt, Error> {
        // A statement opening with `[` or `{` may be a destructuring
        // assignment; try the pattern read first and fall back.
        if matches!(self.cur.kind, TokenKind::LBracket | TokenKind::LBrace) {
            let state = self.save();
            if let Ok(pattern) = self.parse_pattern() {
                if self.cur.kind == TokenKind::Assign {
                    self.advance();
                    let value = self.parse_expression(prec::LOWEST)?;
                    return Ok(Stmt::Assign {
                        token,
                        target: AssignTarget::Pattern(pattern),
                        value,
                    });
                }
            }
            self.restore(state);
        }

        let expr = self.parse_expression(prec::LOWEST)?;

        if self.cur.kind == TokenKind::Assign {
            let target = match &expr {
                Expr::Ident { name, .. } => AssignTarget::Name(name.clone()),
                Expr::Member {
                    object, property, ..
                } => AssignTarget::Member {
                    object: (**object).clone(),
                    property: property.clone(),
                },
                Expr::Index { object, index, .. } => AssignTarget::Index {
                    object: (**object).clone(),
                    index: (**index).clone(),
                },
                _ => {
                    return Err(self.error_at(
                        expr.token(),
                        codes::PARSE_SYNTAX,
                        "this expression cannot be assigned to",
                    ))
                }
            };
            self.advance(); // =
            let value = self.parse_expression(prec::LOWEST)?;
            return Ok(Stmt::Assign {
                token,
                target,
                value,
            });
        }

        Ok(Stmt::Expr { token, expr })
    }

    // ========================================================================
    // Blocks and block-bodied expressions
    // ========================================================================

    pub(crate) fn parse_block(&mut self) -> Result<Block, Error> {
        self.expect(TokenKind::LBrace, "`{` to open a block")?;
        let mut statements = Vec::new();
        while self.cur.kind != TokenKind::RBrace {
            if self.cur.kind == TokenKind::Eof {
                return Err(self.unexpected("`}` to close the block"));
            }
            if self.cur.kind == TokenKind::Semicolon {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(statements)
    }

    pub(crate) fn parse_function_literal(&mut self, token: Token) -> Result<Expr, Error> {
        self.advance(); // fn
        let name = match &self.cur.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let params = self.parse_params()?;
        self.validate_params(&params, &token)?;
        let body = self.parse_block()?;
        Ok(Expr::Function {
            token,
            name,
            params,
            body,
        })
    }

    fn validate_params(&self, params: &[Param], token: &Token) -> Result<(), Error> {
        let mut seen_default = false;
        for param in params {
            if param.rest {
                continue;
            }
            if param.default.is_some() {
                seen_default = true;
            } else if seen_default && matches!(param.pattern, Pattern::Name(_)) {
                return Err(self.error_at(
                    token,
                    codes::PARSE_SYNTAX,
                    "parameters after a defaulted parameter need defaults too",
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn parse_if(&mut self, token: Token) -> Result<Expr, Error> {
        self.advance(); // if

        // Parenthesised condition admits a single-expression body; without
        // parens the body must be a brace block.
        let (condition, parenthesised) = if self.cur.kind == TokenKind::LParen {
            self.advance();
            let condition = self.parse_expression(prec::LOWEST)?;
            self.expect(TokenKind::RParen, "`)` after the condition")?;
            (condition, true)
        } else {
            (self.parse_expression(prec::LOWEST)?, false)
        };

        let consequence = self.parse_body(parenthesised)?;
        let alternative = if self.eat(TokenKind::Else) {
            if self.cur.kind == TokenKind::If {
                let nested_token = self.cur.clone();
                let nested = self.parse_if(nested_token.clone())?;
                Some(vec![Stmt::Expr {
                    token: nested_token,
                    expr: nested,
                }])
            } else {
                Some(self.parse_body(parenthesised)?)
            }
        } else {
            None
        };

        Ok(Expr::If {
            token,
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_body(&mut self, allow_bare_expression: bool) -> Result<Block, Error> {
        if self.cur.kind == TokenKind::LBrace {
            return self.parse_block();
        }
        if !allow_bare_expression {
            return Err(self.unexpected("`{` to open the body"));
        }
        let token = self.cur.clone();
        let expr = self.parse_expression(prec::LOWEST)?;
        Ok(vec![Stmt::Expr { token, expr }])
    }

    pub(crate) fn parse_for(&mut self, token: Token) -> Result<Expr, Error> {
        self.advance(); // for

        if self.cur.kind == TokenKind::LParen {
            let state = self.save();
            self.advance(); // (
            // Iteration form with parens: `for (k, v in xs) body`.
            if let Ok(parsed) = self.parse_for_bindings() {
                let (key, value) = parsed;
                if self.eat(TokenKind::In) {
                    let iterable = self.parse_expression(prec::LOWEST)?;
                    self.expect(TokenKind::RParen, "`)` after the iterable")?;
                    let body = self.parse_body(true)?;
                    return Ok(Expr::For {
                        token,
                        key,
                        value,
                        iterable: Box::new(iterable),
                        body,
                    });
                }
            }
            // Mapping form: `for (xs) f`.
            self.restore(state);
            self.advance(); // (
            let iterable = self.parse_expression(prec::LOWEST)?;
            self.expect(TokenKind::RParen, "`)` after the iterable")?;
            let mapper = self.parse_expression(prec::LOWEST)?;
            return Ok(Expr::ForMap {
                token,
                iterable: Box::new(iterable),
                mapper: Box::new(mapper),
            });
        }

        // Paren-free iteration requires a brace-block body.
        let (key, value) = self.parse_for_bindings()?;
        self.expect(TokenKind::In, "`in` in for loop")?;
        let iterable = self.parse_expression(prec::LOWEST)?;
        let body = self.parse_block()?;
        Ok(Expr::For {
            token,
            key,
            value,
            iterable: Box::new(iterable),
            body,
        })
    }

    /// `value` or `key, value` bindings of an iteration `for`.
    fn parse_for_bindings(&mut self) -> Result<(Option<Pattern>, Pattern), Error> {
        let first = self.parse_pattern()?;
        if self.eat(TokenKind::Comma) {
            let second = self.parse_pattern()?;
            Ok((Some(first), second))
        } else {
            Ok((None, first))
        }
    }
}
