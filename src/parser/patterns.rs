// ABOUTME: Pattern parsing for let, destructuring, parameters, and for-bindings
// Patterns admit nested array `[a, b, ...rest]` and dictionary
// `{a, b: nested, c as alias, ...rest}` forms, plus `_` for discard.

use super::{prec, Parser};
use crate::ast::{DictFieldPattern, Param, Pattern};
use crate::error::{codes, Error};
use crate::token::TokenKind;

impl<'a> Parser<'a> {
    pub(crate) fn parse_pattern(&mut self) -> Result<Pattern, Error> {
        match &self.cur.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(Pattern::Name(name))
            }
            TokenKind::Underscore => {
                self.advance();
                Ok(Pattern::Discard)
            }
            TokenKind::LBracket => self.parse_array_pattern(),
            TokenKind::LBrace => self.parse_dict_pattern(),
            _ => Err(self.error_at(
                &self.cur,
                codes::PARSE_BAD_PATTERN,
                format!("expected a pattern, found {}", self.cur.kind.describe()),
            )),
        }
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, Error> {
        self.advance(); // [
        let mut items = Vec::new();
        let mut rest = None;
        while self.cur.kind != TokenKind::RBracket {
            if self.eat(TokenKind::Ellipsis) {
                let (_, name) = self.expect_ident("a rest binding name")?;
                rest = Some(name);
                break;
            }
            items.push(self.parse_pattern()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "`]` to close the pattern")?;
        Ok(Pattern::Array { items, rest })
    }

    fn parse_dict_pattern(&mut self) -> Result<Pattern, Error> {
        self.advance(); // {
        let mut fields = Vec::new();
        let mut rest = None;
        while self.cur.kind != TokenKind::RBrace {
            if self.eat(TokenKind::Ellipsis) {
                let (_, name) = self.expect_ident("a rest binding name")?;
                rest = Some(name);
                break;
            }
            let (_, key) = self.expect_ident("a field name")?;
            let mut field = DictFieldPattern {
                key,
                alias: None,
                nested: None,
                default: None,
            };
            if self.eat(TokenKind::As) {
                let (_, alias) = self.expect_ident("an alias after `as`")?;
                field.alias = Some(alias);
            } else if self.eat(TokenKind::Colon) {
                field.nested = Some(self.parse_pattern()?);
            }
            if self.eat(TokenKind::Assign) {
                field.default = Some(self.parse_expression(prec::LOWEST)?);
            }
            fields.push(field);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}` to close the pattern")?;
        Ok(Pattern::Dict { fields, rest })
    }

    /// Parameter list of a function literal: `(a, b = 1, ...rest)`.
    pub(crate) fn parse_params(&mut self) -> Result<Vec<Param>, Error> {
        self.expect(TokenKind::LParen, "`(` to open the parameter list")?;
        let mut params: Vec<Param> = Vec::new();
        while self.cur.kind != TokenKind::RParen {
            if self.eat(TokenKind::Ellipsis) {
                let (_, name) = self.expect_ident("a rest parameter name")?;
                params.push(Param {
                    pattern: Pattern::Name(name),
                    default: None,
                    rest: true,
                });
                break;
            }
            let pattern = self.parse_pattern()?;
            let default = if self.eat(TokenKind::Assign) {
                Some(self.parse_expression(prec::LOWEST)?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                default,
                rest: false,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)` to close the parameter list")?;
        Ok(params)
    }
}
