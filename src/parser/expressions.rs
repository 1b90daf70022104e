// ABOUTME: Expression parsing — null denotations, left denotations, precedence
// The Pratt core: each token kind has a prefix handler and, when it can
// continue an expression, an infix binding power and handler.

use super::{prec, Parser};
use crate::ast::{DbOp, DictEntry, DictKey, Expr, InfixOp, PrefixOp, SchemaField, WriteMode};
use crate::error::{codes, Error};
use crate::token::TokenKind;

fn infix_precedence(kind: &TokenKind) -> Option<u8> {
    use TokenKind as T;
    Some(match kind {
        T::WriteTo | T::AppendTo | T::ForceWriteTo | T::ForceAppendTo => prec::WRITE,
        T::Or | T::OrOr | T::Pipe | T::Coalesce => prec::OR,
        T::And | T::AndAnd | T::Amp => prec::AND,
        T::Eq
        | T::NotEq
        | T::Tilde
        | T::NotTilde
        | T::In
        | T::Not
        | T::Is
        | T::QueryOne
        | T::QueryMany
        | T::ExecOn
        | T::ShellOn => prec::EQUALITY,
        T::Lt | T::Gt | T::Le | T::Ge => prec::RELATIONAL,
        T::Plus | T::Minus | T::DotDot => prec::SUM,
        T::PlusPlus => prec::CONCAT,
        T::Star | T::Slash | T::Percent => prec::PRODUCT,
        T::LParen | T::LBracket | T::Dot => prec::POSTFIX,
        _ => return None,
    })
}

pub(crate) fn can_start_expression(kind: &TokenKind) -> bool {
    use TokenKind as T;
    matches!(
        kind,
        T::Int(_)
            | T::Float(_)
            | T::Str(_)
            | T::TemplateStr(_)
            | T::RawStr(_)
            | T::Money(_)
            | T::Datetime(_)
            | T::Duration(_)
            | T::PathLit(_)
            | T::UrlLit(_)
            | T::SigilTemplate(_)
            | T::Regex { .. }
            | T::True
            | T::False
            | T::Null
            | T::Ident(_)
            | T::Underscore
            | T::ContextRef(_)
            | T::ConnDriver(_)
            | T::QueryVerb(_)
            | T::StdRef(_)
            | T::BasilRef(_)
            | T::Minus
            | T::Bang
            | T::Not
            | T::LParen
            | T::LBracket
            | T::LBrace
            | T::Fn
            | T::If
            | T::For
            | T::Try
            | T::TagStart(_)
            | T::FragmentStart
            | T::ReadFrom
    )
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self, min_prec: u8) -> Result<Expr, Error> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some(op_prec) = infix_precedence(&self.cur.kind) else {
                break;
            };
            if op_prec <= min_prec {
                break;
            }
            // A `(` or `[` opening a new line starts a new statement, not a
            // call or index on the previous expression.
            if matches!(self.cur.kind, TokenKind::LParen | TokenKind::LBracket)
                && self.cur.line > self.last_line
            {
                break;
            }
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    // ========================================================================
    // Prefix positions
    // ========================================================================

    fn parse_prefix(&mut self) -> Result<Expr, Error> {
        let token = self.cur.clone();
        match &token.kind {
            TokenKind::Int(value) => {
                let value = *value;
                self.advance();
                Ok(Expr::Int { token, value })
            }
            TokenKind::Float(value) => {
                let value = *value;
                self.advance();
                Ok(Expr::Float { token, value })
            }
            TokenKind::Str(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::Str { token, value })
            }
            TokenKind::TemplateStr(parts) | TokenKind::RawStr(parts) => {
                let pieces = self.parse_pieces(&parts.clone(), &token)?;
                self.advance();
                Ok(Expr::Interp { token, pieces })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool { token, value: true })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool {
                    token,
                    value: false,
                })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null { token })
            }
            TokenKind::Regex { pattern, flags } => {
                let (pattern, flags) = (pattern.clone(), flags.clone());
                self.advance();
                Ok(Expr::Regex {
                    token,
                    pattern,
                    flags,
                })
            }
            TokenKind::Money(lit) => {
                let lit = lit.clone();
                self.advance();
                Ok(Expr::Money { token, lit })
            }
            TokenKind::Datetime(lit) => {
                let lit = lit.clone();
                self.advance();
                Ok(Expr::Datetime { token, lit })
            }
            TokenKind::Duration(lit) => {
                let lit = lit.clone();
                self.advance();
                Ok(Expr::Duration { token, lit })
            }
            TokenKind::PathLit(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::PathLit { token, value })
            }
            TokenKind::UrlLit(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::UrlLit { token, value })
            }
            TokenKind::SigilTemplate(parts) => {
                let pieces = self.parse_pieces(&parts.clone(), &token)?;
                self.advance();
                Ok(Expr::SigilTemplate { token, pieces })
            }
            TokenKind::ContextRef(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::ContextRef { token, name })
            }
            TokenKind::StdRef(path) => {
                let path = format!("std/{path}");
                self.advance();
                Ok(Expr::ModuleRef { token, path })
            }
            TokenKind::BasilRef(path) => {
                let path = format!("basil/{path}");
                self.advance();
                Ok(Expr::ModuleRef { token, path })
            }
            TokenKind::ConnDriver(driver) => {
                let driver = driver.clone();
                self.advance();
                let target = if self.eat(TokenKind::LParen) {
                    let target = self.parse_expression(prec::LOWEST)?;
                    self.expect(TokenKind::RParen, "`)` after connection target")?;
                    Some(Box::new(target))
                } else {
                    None
                };
                Ok(Expr::ConnLit {
                    token,
                    driver,
                    target,
                })
            }
            TokenKind::QueryVerb(verb) => {
                let verb = verb.clone();
                self.advance();
                if verb == "schema" {
                    self.parse_schema_decl(token)
                } else {
                    self.parse_query_dsl(token, verb)
                }
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Ident { token, name })
            }
            TokenKind::Underscore => {
                self.advance();
                Ok(Expr::Ident {
                    token,
                    name: "_".to_string(),
                })
            }
            TokenKind::Minus => {
                self.advance();
                let right = self.parse_expression(prec::PREFIX)?;
                Ok(Expr::Prefix {
                    token,
                    op: PrefixOp::Neg,
                    right: Box::new(right),
                })
            }
            TokenKind::Bang | TokenKind::Not => {
                self.advance();
                let right = self.parse_expression(prec::PREFIX)?;
                Ok(Expr::Prefix {
                    token,
                    op: PrefixOp::Not,
                    right: Box::new(right),
                })
            }
            TokenKind::ReadFrom => {
                self.advance();
                let source = self.parse_expression(prec::PREFIX)?;
                Ok(Expr::Read {
                    token,
                    source: Box::new(source),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression(prec::LOWEST)?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_literal(token),
            TokenKind::LBrace => self.parse_dict_literal(token),
            TokenKind::Fn => self.parse_function_literal(token),
            TokenKind::If => self.parse_if(token),
            TokenKind::For => self.parse_for(token),
            TokenKind::Try => self.parse_try(token),
            TokenKind::TagStart(name) => {
                let name = name.clone();
                self.parse_tag_expr(token, name)
            }
            TokenKind::FragmentStart => self.parse_fragment_expr(token),
            TokenKind::Illegal(what) => {
                Err(self.error_at(&token, codes::PARSE_ILLEGAL_TOKEN, what.clone()))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    // ========================================================================
    // Infix positions
    // ========================================================================

    fn parse_infix(&mut self, left: Expr) -> Result<Expr, Error> {
        let token = self.cur.clone();
        use TokenKind as T;
        match &token.kind {
            T::LParen => self.parse_call(left),
            T::LBracket => self.parse_index(left),
            T::Dot => {
                self.advance();
                let (_, property) = self.expect_ident("a member name after `.`")?;
                Ok(Expr::Member {
                    token,
                    object: Box::new(left),
                    property,
                })
            }
            T::WriteTo | T::AppendTo | T::ForceWriteTo | T::ForceAppendTo => {
                let mode = match &token.kind {
                    T::WriteTo => WriteMode::Write,
                    T::AppendTo => WriteMode::Append,
                    T::ForceWriteTo => WriteMode::ForceWrite,
                    _ => WriteMode::ForceAppend,
                };
                self.advance();
                let target = self.parse_expression(prec::WRITE)?;
                Ok(Expr::WriteFile {
                    token,
                    mode,
                    value: Box::new(left),
                    target: Box::new(target),
                })
            }
            T::QueryOne | T::QueryMany | T::ExecOn | T::ShellOn => {
                let op = match &token.kind {
                    T::QueryOne => DbOp::QueryOne,
                    T::QueryMany => DbOp::QueryMany,
                    T::ExecOn => DbOp::Execute,
                    _ => DbOp::Shell,
                };
                self.advance();
                let right = self.parse_expression(prec::EQUALITY)?;
                Ok(Expr::Db {
                    token,
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            T::Not => {
                // Compound `not in`.
                if self.peek.kind != T::In {
                    return Err(self.unexpected("`in` after `not`"));
                }
                self.advance();
                self.advance();
                let right = self.parse_expression(prec::EQUALITY)?;
                Ok(Expr::Infix {
                    token,
                    op: InfixOp::NotIn,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            T::Is => {
                // Compound `is not`.
                let op = if self.peek.kind == T::Not {
                    self.advance();
                    self.advance();
                    InfixOp::IsNot
                } else {
                    self.advance();
                    InfixOp::Is
                };
                let right = self.parse_expression(prec::EQUALITY)?;
                Ok(Expr::Infix {
                    token,
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            T::DotDot => {
                self.advance();
                // Open-ended ranges appear in slice position: `xs[1..]`.
                let right = if can_start_expression(&self.cur.kind) {
                    self.parse_expression(prec::SUM)?
                } else {
                    Expr::Null {
                        token: token.clone(),
                    }
                };
                Ok(Expr::Infix {
                    token,
                    op: InfixOp::Range,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            _ => {
                let op = match &token.kind {
                    T::Or | T::OrOr => InfixOp::Or,
                    T::Pipe => InfixOp::SetUnion,
                    T::Coalesce => InfixOp::Coalesce,
                    T::And | T::AndAnd => InfixOp::And,
                    T::Amp => InfixOp::SetIntersect,
                    T::Eq => InfixOp::Eq,
                    T::NotEq => InfixOp::NotEq,
                    T::Tilde => InfixOp::Match,
                    T::NotTilde => InfixOp::NotMatch,
                    T::In => InfixOp::In,
                    T::Lt => InfixOp::Lt,
                    T::Gt => InfixOp::Gt,
                    T::Le => InfixOp::Le,
                    T::Ge => InfixOp::Ge,
                    T::Plus => InfixOp::Add,
                    T::Minus => InfixOp::Sub,
                    T::PlusPlus => InfixOp::Concat,
                    T::Star => InfixOp::Mul,
                    T::Slash => InfixOp::Div,
                    T::Percent => InfixOp::Mod,
                    _ => return Err(self.unexpected("an operator")),
                };
                let op_prec = infix_precedence(&token.kind).unwrap_or(prec::LOWEST);
                self.advance();
                let right = self.parse_expression(op_prec)?;
                Ok(Expr::Infix {
                    token,
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
        }
    }

    fn parse_call(&mut self, callee: Expr) -> Result<Expr, Error> {
        let token = self.cur.clone();
        self.advance(); // (
        let mut args = Vec::new();
        if self.cur.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expression(prec::LOWEST)?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                if self.cur.kind == TokenKind::RParen {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)` to close the call")?;
        Ok(Expr::Call {
            token,
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_index(&mut self, object: Expr) -> Result<Expr, Error> {
        let token = self.cur.clone();
        self.advance(); // [
        let optional = self.eat(TokenKind::Question);

        // `xs[..n]`
        if self.eat(TokenKind::DotDot) {
            let end = if self.cur.kind == TokenKind::RBracket {
                None
            } else {
                Some(Box::new(self.parse_expression(prec::LOWEST)?))
            };
            self.expect(TokenKind::RBracket, "`]`")?;
            return Ok(Expr::Slice {
                token,
                object: Box::new(object),
                start: None,
                end,
            });
        }

        let index = self.parse_expression(prec::LOWEST)?;
        self.expect(TokenKind::RBracket, "`]`")?;

        // A range index is a slice: `xs[1..3]`, `xs[1..]`.
        if let Expr::Infix {
            op: InfixOp::Range,
            left,
            right,
            ..
        } = index
        {
            let end = match *right {
                Expr::Null { .. } => None,
                other => Some(Box::new(other)),
            };
            return Ok(Expr::Slice {
                token,
                object: Box::new(object),
                start: Some(left),
                end,
            });
        }

        Ok(Expr::Index {
            token,
            object: Box::new(object),
            index: Box::new(index),
            optional,
        })
    }

    fn parse_array_literal(&mut self, token: crate::token::Token) -> Result<Expr, Error> {
        self.advance(); // [
        let mut elements = Vec::new();
        while self.cur.kind != TokenKind::RBracket {
            elements.push(self.parse_expression(prec::LOWEST)?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "`]` to close the array")?;
        Ok(Expr::Array { token, elements })
    }

    fn parse_dict_literal(&mut self, token: crate::token::Token) -> Result<Expr, Error> {
        self.advance(); // {
        let mut entries = Vec::new();
        while self.cur.kind != TokenKind::RBrace {
            if self.eat(TokenKind::Ellipsis) {
                let spread = self.parse_expression(prec::LOWEST)?;
                entries.push(DictEntry::Spread(spread));
            } else {
                let key = match &self.cur.kind {
                    TokenKind::Ident(name) => {
                        let name = name.clone();
                        self.advance();
                        DictKey::Ident(name)
                    }
                    TokenKind::Str(value) => {
                        let value = value.clone();
                        self.advance();
                        DictKey::Str(value)
                    }
                    TokenKind::LBracket => {
                        self.advance();
                        let computed = self.parse_expression(prec::LOWEST)?;
                        self.expect(TokenKind::RBracket, "`]` after computed key")?;
                        DictKey::Computed(Box::new(computed))
                    }
                    _ => return Err(self.unexpected("a dictionary key")),
                };
                if self.eat(TokenKind::Colon) {
                    let value = self.parse_expression(prec::LOWEST)?;
                    entries.push(DictEntry::KeyValue(key, value));
                } else if let DictKey::Ident(name) = key {
                    entries.push(DictEntry::Shorthand(name));
                } else {
                    return Err(self.unexpected("`:` after dictionary key"));
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}` to close the dictionary")?;
        Ok(Expr::Dict { token, entries })
    }

    fn parse_try(&mut self, token: crate::token::Token) -> Result<Expr, Error> {
        self.advance(); // try
        let call = self.parse_expression(prec::LOWEST)?;
        if !matches!(call, Expr::Call { .. }) {
            return Err(self.error_at(
                call.token(),
                codes::PARSE_SYNTAX,
                "`try` expects a function or method call",
            ));
        }
        Ok(Expr::Try {
            token,
            call: Box::new(call),
        })
    }

    // ========================================================================
    // Schema declarations and the query DSL
    // ========================================================================

    fn parse_schema_decl(&mut self, token: crate::token::Token) -> Result<Expr, Error> {
        let (_, name) = self.expect_ident("a schema name")?;
        self.expect(TokenKind::LBrace, "`{` to open the schema body")?;
        let mut fields = Vec::new();
        while self.cur.kind != TokenKind::RBrace {
            let (_, field_name) = self.expect_ident("a field name")?;
            self.expect(TokenKind::Colon, "`:` after the field name")?;
            let spec = self.parse_expression(prec::LOWEST)?;
            fields.push(SchemaField {
                name: field_name,
                spec,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}` to close the schema body")?;
        Ok(Expr::SchemaDecl {
            token,
            name,
            fields,
        })
    }

    fn parse_query_dsl(
        &mut self,
        token: crate::token::Token,
        verb: String,
    ) -> Result<Expr, Error> {
        let source = if self.eat(TokenKind::LParen) {
            let source = self.parse_expression(prec::LOWEST)?;
            self.expect(TokenKind::RParen, "`)` after the query source")?;
            Some(Box::new(source))
        } else {
            None
        };

        let mut clauses = Vec::new();
        if self.cur.kind == TokenKind::LBrace {
            self.advance();
            while self.cur.kind != TokenKind::RBrace {
                let (_, clause) = self.expect_ident("a clause name")?;
                self.expect(TokenKind::Colon, "`:` after the clause name")?;
                let value = self.parse_expression(prec::LOWEST)?;
                clauses.push((clause, value));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "`}` to close the clauses")?;
        } else if verb == "transaction" && self.cur.kind == TokenKind::Fn {
            let body = self.parse_expression(prec::LOWEST)?;
            clauses.push(("body".to_string(), body));
        }

        Ok(Expr::QueryDsl {
            token,
            verb,
            source,
            clauses,
        })
    }
}
