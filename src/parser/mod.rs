// ABOUTME: Pratt parser for the Basil script language
// Builds the AST from the lazily-produced token stream. Error-tolerant at
// statement boundaries: a failed statement is recorded and parsing resumes
// at the next line or semicolon.

mod expressions;
mod patterns;
mod statements;
mod tags;

#[cfg(test)]
mod tests;

use crate::ast::{Expr, Piece, Stmt};
use crate::error::{codes, Error};
use crate::lexer::{LexState, Lexer};
use crate::token::{StrPart, Token, TokenKind};

/// Binding powers, lowest to highest. Tags sit above the comparisons so a
/// `<tag>` in expression position is never read as a less-than chain.
pub(crate) mod prec {
    pub const LOWEST: u8 = 0;
    /// `==>` and friends bind loosest so the whole left expression is the
    /// value written to the target.
    pub const WRITE: u8 = 1;
    pub const OR: u8 = 2;
    pub const AND: u8 = 3;
    pub const EQUALITY: u8 = 4;
    pub const RELATIONAL: u8 = 5;
    pub const SUM: u8 = 6;
    pub const CONCAT: u8 = 7;
    pub const PRODUCT: u8 = 8;
    pub const PREFIX: u8 = 9;
    pub const POSTFIX: u8 = 10;
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    pub(crate) cur: Token,
    pub(crate) peek: Token,
    /// Line of the most recently consumed token; a `(` or `[` on a later
    /// line starts a new statement instead of continuing the expression.
    pub(crate) last_line: u32,
    file: Option<String>,
}

/// Snapshot for backtracking over ambiguous prefixes (destructuring
/// assignment vs expression, `for` iteration vs mapping).
pub(crate) struct ParseState {
    lex: LexState,
    cur: Token,
    peek: Token,
    last_line: u32,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut lexer = Lexer::new(src);
        let cur = lexer.next();
        let peek = lexer.next();
        Parser {
            lexer,
            cur,
            peek,
            last_line: 1,
            file: None,
        }
    }

    pub fn with_file(src: &'a str, file: impl Into<String>) -> Self {
        let mut parser = Parser::new(src);
        parser.file = Some(file.into());
        parser
    }

    /// Parse a whole program. Accumulates statement-level errors and returns
    /// them all; the partial AST is discarded when any statement failed.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, Vec<Error>> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();
        while self.cur.kind != TokenKind::Eof {
            if self.cur.kind == TokenKind::Semicolon {
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    let line = err.line.unwrap_or(self.cur.line);
                    errors.push(err);
                    self.synchronise(line);
                }
            }
        }
        if errors.is_empty() {
            Ok(statements)
        } else {
            Err(errors)
        }
    }

    /// Skip to the next statement boundary: a later line, a semicolon, or
    /// end of input.
    fn synchronise(&mut self, error_line: u32) {
        while self.cur.kind != TokenKind::Eof {
            if self.cur.kind == TokenKind::Semicolon {
                self.advance();
                return;
            }
            if self.cur.line > error_line {
                return;
            }
            self.advance();
        }
    }

    // ========================================================================
    // Token plumbing
    // ========================================================================

    pub(crate) fn advance(&mut self) {
        self.last_line = self.cur.line;
        self.cur = std::mem::replace(&mut self.peek, self.lexer.next());
    }

    pub(crate) fn save(&self) -> ParseState {
        ParseState {
            lex: self.lexer.save(),
            cur: self.cur.clone(),
            peek: self.peek.clone(),
            last_line: self.last_line,
        }
    }

    pub(crate) fn restore(&mut self, state: ParseState) {
        self.lexer.restore(state.lex);
        self.cur = state.cur;
        self.peek = state.peek;
        self.last_line = state.last_line;
    }

    pub(crate) fn error_at(&self, token: &Token, code: &str, message: impl Into<String>) -> Error {
        let mut err = Error::parse(code, message).at(token.line, token.column);
        if let Some(file) = &self.file {
            err = err.in_file(file.clone());
        }
        err
    }

    pub(crate) fn unexpected(&self, wanted: &str) -> Error {
        self.error_at(
            &self.cur,
            codes::PARSE_SYNTAX,
            format!("expected {wanted}, found {}", self.cur.kind.describe()),
        )
    }

    /// Consume the current token if it matches, otherwise error.
    pub(crate) fn expect(&mut self, kind: TokenKind, wanted: &str) -> Result<Token, Error> {
        if self.cur.kind == kind {
            let token = self.cur.clone();
            self.advance();
            Ok(token)
        } else if let TokenKind::Illegal(what) = &self.cur.kind {
            Err(self.error_at(&self.cur, codes::PARSE_ILLEGAL_TOKEN, what.clone()))
        } else {
            Err(self.unexpected(wanted))
        }
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.cur.kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_ident(&mut self, wanted: &str) -> Result<(Token, String), Error> {
        match &self.cur.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let token = self.cur.clone();
                self.advance();
                Ok((token, name))
            }
            _ => Err(self.unexpected(wanted)),
        }
    }

    // ========================================================================
    // Interpolation sub-parsing
    // ========================================================================

    /// Turn lexer string parts into AST pieces by sub-parsing each
    /// expression hole.
    pub(crate) fn parse_pieces(
        &self,
        parts: &[StrPart],
        token: &Token,
    ) -> Result<Vec<Piece>, Error> {
        let mut pieces = Vec::new();
        for part in parts {
            match part {
                StrPart::Lit(text) => pieces.push(Piece::Lit(text.clone())),
                StrPart::Expr(src) => {
                    let expr = parse_snippet(src).map_err(|mut err| {
                        // Rebase the inner position onto the outer literal.
                        err.line = Some(token.line);
                        err.column = Some(token.column);
                        err
                    })?;
                    pieces.push(Piece::Expr(Box::new(expr)));
                }
            }
        }
        Ok(pieces)
    }
}

/// Parse a single expression from an interpolation hole.
pub(crate) fn parse_snippet(src: &str) -> Result<Expr, Error> {
    let mut parser = Parser::new(src);
    let expr = parser.parse_expression(prec::LOWEST)?;
    if parser.cur.kind != TokenKind::Eof {
        return Err(parser.unexpected("end of interpolation"));
    }
    Ok(expr)
}

/// Convenience wrapper used by the engine API and tests.
pub fn parse(src: &str) -> Result<Vec<Stmt>, Vec<Error>> {
    Parser::new(src).parse_program()
}
