// ABOUTME: Tag expression parsing — attributes, children, fragments
// The lexer has already switched into tag mode when these run; the parser
// assembles TagNode trees and validates singleton and close-tag rules.

use super::{prec, Parser};
use crate::ast::{Expr, TagAttr, TagChild, TagNode};
use crate::config::is_singleton_element;
use crate::error::{codes, Error};
use crate::token::{Token, TokenKind};

impl<'a> Parser<'a> {
    pub(crate) fn parse_tag_expr(&mut self, token: Token, name: String) -> Result<Expr, Error> {
        let node = self.parse_tag_node(token.clone(), name)?;
        Ok(Expr::Tag { token, node })
    }

    pub(crate) fn parse_fragment_expr(&mut self, token: Token) -> Result<Expr, Error> {
        self.advance(); // <>
        let children = self.parse_children(&token, None)?;
        Ok(Expr::Tag {
            token: token.clone(),
            node: TagNode {
                token,
                name: String::new(),
                attrs: Vec::new(),
                children,
                self_closing: false,
            },
        })
    }

    fn parse_tag_node(&mut self, token: Token, name: String) -> Result<TagNode, Error> {
        self.advance(); // <name
        let attrs = self.parse_attrs()?;

        if self.cur.kind == TokenKind::TagSelfClose {
            self.advance();
            return Ok(TagNode {
                token,
                name,
                attrs,
                children: Vec::new(),
                self_closing: true,
            });
        }

        self.expect(TokenKind::TagEnd, "`>` or `/>` to close the tag header")?;

        if is_singleton_element(&name) {
            return Err(self.error_at(
                &token,
                codes::PARSE_SINGLETON,
                format!("`<{name}>` is a singleton element and must be written `<{name} />`"),
            ));
        }

        let children = self.parse_children(&token, Some(&name))?;
        Ok(TagNode {
            token,
            name,
            attrs,
            children,
            self_closing: false,
        })
    }

    fn parse_attrs(&mut self) -> Result<Vec<TagAttr>, Error> {
        let mut attrs = Vec::new();
        loop {
            match self.cur.kind.clone() {
                TokenKind::TagEnd | TokenKind::TagSelfClose => return Ok(attrs),
                TokenKind::Ident(name) => {
                    self.advance();
                    if self.eat(TokenKind::Assign) {
                        match self.cur.kind.clone() {
                            TokenKind::Str(value) => {
                                self.advance();
                                attrs.push(TagAttr::Literal { name, value });
                            }
                            TokenKind::LBrace => {
                                self.advance();
                                let value = self.parse_expression(prec::LOWEST)?;
                                self.expect(TokenKind::RBrace, "`}` after the attribute value")?;
                                attrs.push(TagAttr::Expr { name, value });
                            }
                            _ => {
                                return Err(self.unexpected(
                                    "a string or `{expression}` attribute value",
                                ))
                            }
                        }
                    } else {
                        attrs.push(TagAttr::Bare(name));
                    }
                }
                TokenKind::LBrace => {
                    self.advance();
                    self.expect(
                        TokenKind::Ellipsis,
                        "`...` to spread attributes inside `{`",
                    )?;
                    let value = self.parse_expression(prec::LOWEST)?;
                    self.expect(TokenKind::RBrace, "`}` after the spread")?;
                    attrs.push(TagAttr::Spread(value));
                }
                TokenKind::Illegal(what) => {
                    return Err(self.error_at(&self.cur, codes::PARSE_ILLEGAL_TOKEN, what))
                }
                _ => return Err(self.unexpected("an attribute, `>`, or `/>`")),
            }
        }
    }

    fn parse_children(
        &mut self,
        open_token: &Token,
        name: Option<&str>,
    ) -> Result<Vec<TagChild>, Error> {
        let mut children = Vec::new();
        loop {
            match self.cur.kind.clone() {
                TokenKind::TagClose(closing) => {
                    self.advance();
                    match name {
                        Some(open_name) if closing == open_name => return Ok(children),
                        Some(open_name) => {
                            return Err(self.error_at(
                                open_token,
                                codes::PARSE_TAG_MISMATCH,
                                format!("`<{open_name}>` closed by `</{closing}>`"),
                            ))
                        }
                        None => {
                            return Err(self.error_at(
                                open_token,
                                codes::PARSE_TAG_MISMATCH,
                                format!("fragment closed by `</{closing}>`"),
                            ))
                        }
                    }
                }
                TokenKind::FragmentClose => {
                    self.advance();
                    match name {
                        None => return Ok(children),
                        Some(open_name) => {
                            return Err(self.error_at(
                                open_token,
                                codes::PARSE_TAG_MISMATCH,
                                format!("`<{open_name}>` closed by `</>`"),
                            ))
                        }
                    }
                }
                TokenKind::Text(text) => {
                    self.advance();
                    // Formatting whitespace (spanning a newline) is dropped;
                    // inline spacing is content.
                    let formatting_only = text.trim().is_empty() && text.contains('\n');
                    if !text.is_empty() && !formatting_only {
                        children.push(TagChild::Text(text));
                    }
                }
                TokenKind::TagStart(child_name) => {
                    let child_token = self.cur.clone();
                    let node = self.parse_tag_node(child_token, child_name)?;
                    children.push(TagChild::Tag(node));
                }
                TokenKind::FragmentStart => {
                    let child_token = self.cur.clone();
                    self.advance();
                    let nested = self.parse_children(&child_token, None)?;
                    children.push(TagChild::Tag(TagNode {
                        token: child_token,
                        name: String::new(),
                        attrs: Vec::new(),
                        children: nested,
                        self_closing: false,
                    }));
                }
                TokenKind::LBrace => {
                    self.advance();
                    let expr = self.parse_expression(prec::LOWEST)?;
                    self.expect(TokenKind::RBrace, "`}` after the interpolation")?;
                    children.push(TagChild::Expr(expr));
                }
                TokenKind::Str(value) => {
                    let token = self.cur.clone();
                    self.advance();
                    children.push(TagChild::Expr(Expr::Str { token, value }));
                }
                TokenKind::Eof => {
                    let what = match name {
                        Some(open_name) => format!("`</{open_name}>`"),
                        None => "`</>`".to_string(),
                    };
                    return Err(self.error_at(
                        open_token,
                        codes::PARSE_TAG_MISMATCH,
                        format!("unclosed tag, expected {what}"),
                    ));
                }
                TokenKind::Illegal(what) => {
                    return Err(self.error_at(&self.cur, codes::PARSE_ILLEGAL_TOKEN, what))
                }
                _ => return Err(self.unexpected("tag content")),
            }
        }
    }
}
