// ABOUTME: Tag-mode lexing — attribute headers, child text, raw text bodies
// After `<name` the scanner is in attribute mode until `>` or `/>`. Between
// `>` and the matching `</name>` it emits text runs, nested tags, string
// literals, and `{expr}` holes. `<script>` and `<style>` bodies are raw text
// where only `@{...}` interpolation and the closing tag are recognised.

use super::{Lexer, Mode};
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    // ------------------------------------------------------------------------
    // Attribute headers: `<name HERE >` / `<name HERE />`
    // ------------------------------------------------------------------------

    pub(crate) fn next_tag_attr(&mut self) -> Token {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
        let start = self.mark();
        let Some(ch) = self.peek_char() else {
            return self.illegal("unterminated tag", start);
        };

        match ch {
            '/' if self.starts_with("/>") => {
                self.eat("/>");
                self.pop_mode();
                self.make(TokenKind::TagSelfClose, start)
            }
            '>' => {
                self.bump();
                let name = match self.mode() {
                    Mode::TagAttrs(name) => name,
                    _ => String::new(),
                };
                self.pop_mode();
                if name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style") {
                    self.push_mode(Mode::RawText(name));
                } else {
                    self.push_mode(Mode::TagText);
                }
                self.make(TokenKind::TagEnd, start)
            }
            '{' => {
                self.bump();
                self.push_mode(Mode::Interp { depth: 1 });
                self.make(TokenKind::LBrace, start)
            }
            '=' => {
                self.bump();
                self.make(TokenKind::Assign, start)
            }
            '"' => self.lex_attr_double_string(start),
            '\'' => self.lex_attr_raw_string(start),
            ch if ch.is_ascii_alphabetic() || ch == '_' => {
                let mut name = String::new();
                while let Some(ch) = self.peek_char() {
                    if ch.is_alphanumeric() || matches!(ch, '_' | '-' | ':') {
                        name.push(ch);
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.make(TokenKind::Ident(name), start)
            }
            other => {
                self.bump();
                self.illegal(format!("unexpected `{other}` in tag"), start)
            }
        }
    }

    fn lex_attr_double_string(&mut self, start: (usize, u32, u32)) -> Token {
        self.bump(); // "
        let mut out = String::new();
        loop {
            match self.peek_char() {
                None => return self.illegal("unterminated attribute value", start),
                Some('"') => {
                    self.bump();
                    return self.make(TokenKind::Str(out), start);
                }
                Some('\\') => {
                    self.bump();
                    match self.escape_char() {
                        Ok(ch) => out.push(ch),
                        Err(bad) => {
                            return self.illegal(format!("unknown escape `\\{bad}`"), start)
                        }
                    }
                }
                Some(ch) => {
                    out.push(ch);
                    self.bump();
                }
            }
        }
    }

    /// Raw attribute value: backslashes kept verbatim.
    fn lex_attr_raw_string(&mut self, start: (usize, u32, u32)) -> Token {
        self.bump(); // '
        let mut out = String::new();
        loop {
            match self.peek_char() {
                None => return self.illegal("unterminated attribute value", start),
                Some('\'') => {
                    self.bump();
                    return self.make(TokenKind::Str(out), start);
                }
                Some(ch) => {
                    out.push(ch);
                    self.bump();
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Child content: between `>` and `</name>`
    // ------------------------------------------------------------------------

    pub(crate) fn next_tag_text(&mut self) -> Token {
        let start = self.mark();
        let Some(ch) = self.peek_char() else {
            return Token::eof(self.line, self.column, self.pos);
        };

        if ch == '<' {
            if self.starts_with("</>") {
                self.eat("</>");
                self.pop_mode();
                return self.make(TokenKind::FragmentClose, start);
            }
            if self.starts_with("</") {
                self.eat("</");
                let name = self.read_tag_name();
                if !self.eat(">") {
                    return self.illegal(format!("malformed closing tag `</{name}`"), start);
                }
                self.pop_mode();
                return self.make(TokenKind::TagClose(name), start);
            }
            if self
                .peek_char_at(1)
                .map(|c| c.is_ascii_alphabetic())
                .unwrap_or(false)
            {
                self.bump(); // <
                let name = self.read_tag_name();
                self.push_mode(Mode::TagAttrs(name.clone()));
                return self.make(TokenKind::TagStart(name), start);
            }
            if self.starts_with("<>") {
                self.eat("<>");
                self.push_mode(Mode::TagText);
                return self.make(TokenKind::FragmentStart, start);
            }
            // A lone `<` is ordinary text.
            self.bump();
            return self.make(TokenKind::Text("<".to_string()), start);
        }
        if ch == '{' {
            self.bump();
            self.push_mode(Mode::Interp { depth: 1 });
            return self.make(TokenKind::LBrace, start);
        }
        if ch == '"' {
            return self.lex_attr_double_string(start);
        }

        // Plain text run.
        let mut text = String::new();
        while let Some(ch) = self.peek_char() {
            if matches!(ch, '<' | '{' | '"') {
                break;
            }
            text.push(ch);
            self.bump();
        }
        self.make(TokenKind::Text(text), start)
    }

    // ------------------------------------------------------------------------
    // Raw text: `<script>` / `<style>` bodies
    // ------------------------------------------------------------------------

    pub(crate) fn next_raw_text(&mut self) -> Token {
        let name = match self.mode() {
            Mode::RawText(name) => name,
            _ => String::new(),
        };
        let closing = format!("</{name}>");
        let start = self.mark();

        if self.peek_char().is_none() {
            return Token::eof(self.line, self.column, self.pos);
        }
        if self.starts_with(&closing) {
            self.eat(&closing);
            self.pop_mode();
            return self.make(TokenKind::TagClose(name), start);
        }
        if self.starts_with("@{") {
            self.eat("@{");
            self.push_mode(Mode::Interp { depth: 1 });
            return self.make(TokenKind::LBrace, start);
        }

        let mut text = String::new();
        while let Some(ch) = self.peek_char() {
            if (ch == '<' && self.starts_with(&closing))
                || (ch == '@' && self.starts_with("@{"))
            {
                break;
            }
            text.push(ch);
            self.bump();
        }
        self.make(TokenKind::Text(text), start)
    }
}
