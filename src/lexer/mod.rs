// ABOUTME: Lexer for the Basil script language
// A stateful, mode-switching scanner. Normal mode covers expressions; tag
// modes take over inside HTML-like tag syntax; raw-text mode covers
// script/style bodies. Tokens are produced lazily on demand by the parser,
// which may snapshot and restore the scanner for backtracking.

mod sigil;
mod tags;

use crate::token::{MoneyLit, StrPart, Token, TokenKind};

/// Scanner mode. The stack never becomes empty; the bottom entry is Normal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mode {
    Normal,
    /// Inside `<name ... >`; holds the tag name so `>` can route script and
    /// style bodies into raw-text mode.
    TagAttrs(String),
    /// Between `>` and the matching `</name>`.
    TagText,
    /// Inside a `<script>`/`<style>` body.
    RawText(String),
    /// Inside a `{expr}` hole within a tag context.
    Interp { depth: usize },
}

/// Opaque scanner snapshot for `save`/`restore`.
#[derive(Debug, Clone)]
pub struct LexState {
    pos: usize,
    line: u32,
    column: u32,
    modes: Vec<Mode>,
    prev_ends_value: bool,
    prev_line: u32,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    modes: Vec<Mode>,
    /// Class of the most recent non-trivia token; decides whether `<` starts
    /// a tag and whether `/` starts a regex.
    prev_ends_value: bool,
    /// Line of the most recent token; a `<` opening a fresh line starts a
    /// tag even after a value-ending token.
    prev_line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            column: 1,
            modes: vec![Mode::Normal],
            prev_ends_value: false,
            prev_line: 0,
        }
    }

    pub fn save(&self) -> LexState {
        LexState {
            pos: self.pos,
            line: self.line,
            column: self.column,
            modes: self.modes.clone(),
            prev_ends_value: self.prev_ends_value,
            prev_line: self.prev_line,
        }
    }

    pub fn restore(&mut self, state: LexState) {
        self.pos = state.pos;
        self.line = state.line;
        self.column = state.column;
        self.modes = state.modes;
        self.prev_ends_value = state.prev_ends_value;
        self.prev_line = state.prev_line;
    }

    pub fn peek(&mut self) -> Token {
        let state = self.save();
        let token = self.next();
        self.restore(state);
        token
    }

    pub fn next(&mut self) -> Token {
        let token = match self.mode() {
            Mode::TagAttrs(_) => self.next_tag_attr(),
            Mode::TagText => self.next_tag_text(),
            Mode::RawText(_) => self.next_raw_text(),
            Mode::Normal | Mode::Interp { .. } => self.next_normal(),
        };
        self.prev_ends_value = token.kind.ends_value();
        self.prev_line = token.line;
        token
    }

    // ========================================================================
    // Shared scanning helpers
    // ========================================================================

    pub(crate) fn mode(&self) -> Mode {
        self.modes.last().cloned().unwrap_or(Mode::Normal)
    }

    pub(crate) fn push_mode(&mut self, mode: Mode) {
        self.modes.push(mode);
    }

    pub(crate) fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
    }

    pub(crate) fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    pub(crate) fn peek_char_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub(crate) fn starts_with(&self, prefix: &str) -> bool {
        self.src[self.pos..].starts_with(prefix)
    }

    /// Consume `prefix` if present.
    pub(crate) fn eat(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            for _ in prefix.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    pub(crate) fn mark(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.column)
    }

    pub(crate) fn make(&self, kind: TokenKind, start: (usize, u32, u32)) -> Token {
        Token {
            kind,
            lexeme: self.src[start.0..self.pos].to_string(),
            line: start.1,
            column: start.2,
            offset: start.0,
        }
    }

    pub(crate) fn illegal(&self, message: impl Into<String>, start: (usize, u32, u32)) -> Token {
        self.make(TokenKind::Illegal(message.into()), start)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.starts_with("//") => {
                    while let Some(ch) = self.peek_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    // ========================================================================
    // Normal mode
    // ========================================================================

    fn next_normal(&mut self) -> Token {
        self.skip_trivia();
        let start = self.mark();
        let Some(ch) = self.peek_char() else {
            return Token::eof(self.line, self.column, self.pos);
        };

        match ch {
            '#' => {
                // No shell-style comments; `#` only appears inside money codes.
                self.bump();
                self.illegal("`#` comments are not supported, use `//`", start)
            }
            '{' => {
                self.bump();
                if let Some(Mode::Interp { depth }) = self.modes.last_mut() {
                    *depth += 1;
                }
                self.make(TokenKind::LBrace, start)
            }
            '}' => {
                self.bump();
                if let Some(Mode::Interp { depth }) = self.modes.last_mut() {
                    *depth -= 1;
                    if *depth == 0 {
                        self.pop_mode();
                    }
                }
                self.make(TokenKind::RBrace, start)
            }
            '(' => {
                self.bump();
                self.make(TokenKind::LParen, start)
            }
            ')' => {
                self.bump();
                self.make(TokenKind::RParen, start)
            }
            '[' => {
                self.bump();
                self.make(TokenKind::LBracket, start)
            }
            ']' => {
                self.bump();
                self.make(TokenKind::RBracket, start)
            }
            ',' => {
                self.bump();
                self.make(TokenKind::Comma, start)
            }
            ':' => {
                self.bump();
                self.make(TokenKind::Colon, start)
            }
            ';' => {
                self.bump();
                self.make(TokenKind::Semicolon, start)
            }
            '.' => {
                if self.eat("...") {
                    self.make(TokenKind::Ellipsis, start)
                } else if self.eat("..") {
                    self.make(TokenKind::DotDot, start)
                } else {
                    self.bump();
                    self.make(TokenKind::Dot, start)
                }
            }
            '+' => {
                if self.eat("++") {
                    self.make(TokenKind::PlusPlus, start)
                } else {
                    self.bump();
                    self.make(TokenKind::Plus, start)
                }
            }
            '-' => {
                self.bump();
                self.make(TokenKind::Minus, start)
            }
            '*' => {
                self.bump();
                self.make(TokenKind::Star, start)
            }
            '%' => {
                self.bump();
                self.make(TokenKind::Percent, start)
            }
            '/' => {
                if !self.prev_ends_value {
                    self.lex_regex(start)
                } else {
                    self.bump();
                    self.make(TokenKind::Slash, start)
                }
            }
            '~' => {
                self.bump();
                self.make(TokenKind::Tilde, start)
            }
            '!' => {
                if self.eat("!~") {
                    self.make(TokenKind::NotTilde, start)
                } else if self.eat("!=") {
                    self.make(TokenKind::NotEq, start)
                } else {
                    self.bump();
                    self.make(TokenKind::Bang, start)
                }
            }
            '&' => {
                if self.eat("&&") {
                    self.make(TokenKind::AndAnd, start)
                } else {
                    self.bump();
                    self.make(TokenKind::Amp, start)
                }
            }
            '|' => {
                if self.eat("||") {
                    self.make(TokenKind::OrOr, start)
                } else {
                    self.bump();
                    self.make(TokenKind::Pipe, start)
                }
            }
            '?' => {
                if self.eat("??") {
                    self.make(TokenKind::Coalesce, start)
                } else {
                    self.bump();
                    self.make(TokenKind::Question, start)
                }
            }
            '=' => self.lex_equals_family(start),
            '<' => self.lex_angle_family(start),
            '>' => {
                if self.eat(">=") {
                    self.make(TokenKind::Ge, start)
                } else {
                    self.bump();
                    self.make(TokenKind::Gt, start)
                }
            }
            '"' => self.lex_double_string(start),
            '`' => self.lex_template_string(start),
            '\'' => self.lex_raw_string(start),
            '@' => self.lex_sigil(start),
            '$' | '£' | '€' | '¥' => self.lex_money_symbol(start),
            '0'..='9' => self.lex_number(start),
            '_' => {
                if self
                    .peek_char_at(1)
                    .map(|c| c.is_alphanumeric() || c == '_')
                    .unwrap_or(false)
                {
                    self.lex_ident(start)
                } else {
                    self.bump();
                    self.make(TokenKind::Underscore, start)
                }
            }
            ch if ch.is_alphabetic() => self.lex_ident(start),
            other => {
                self.bump();
                self.illegal(format!("unexpected character `{other}`"), start)
            }
        }
    }

    fn lex_equals_family(&mut self, start: (usize, u32, u32)) -> Token {
        if self.eat("==>>") {
            self.make(TokenKind::AppendTo, start)
        } else if self.eat("==>") {
            self.make(TokenKind::WriteTo, start)
        } else if self.eat("==") {
            self.make(TokenKind::Eq, start)
        } else if self.eat("=/=>>") {
            self.make(TokenKind::ForceAppendTo, start)
        } else if self.eat("=/=>") {
            self.make(TokenKind::ForceWriteTo, start)
        } else {
            self.bump();
            self.make(TokenKind::Assign, start)
        }
    }

    fn lex_angle_family(&mut self, start: (usize, u32, u32)) -> Token {
        // Tag start: `<` followed by a letter when the previous token cannot
        // end a value, or `<>` for a fragment. A `<` opening a fresh line is
        // in statement position regardless of what the previous line ended
        // with.
        let expression_position = !self.prev_ends_value || start.1 > self.prev_line;
        if expression_position {
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
        }
        if self.eat("<=??=>") {
            self.make(TokenKind::QueryMany, start)
        } else if self.eat("<=?=>") {
            self.make(TokenKind::QueryOne, start)
        } else if self.eat("<=!=>") {
            self.make(TokenKind::ExecOn, start)
        } else if self.eat("<=#=>") {
            self.make(TokenKind::ShellOn, start)
        } else if self.eat("<==") {
            self.make(TokenKind::ReadFrom, start)
        } else if self.eat("<=") {
            self.make(TokenKind::Le, start)
        } else {
            self.bump();
            self.make(TokenKind::Lt, start)
        }
    }

    pub(crate) fn read_tag_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                name.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    // ========================================================================
    // Identifiers, keywords, and prefixed money
    // ========================================================================

    fn lex_ident(&mut self, start: (usize, u32, u32)) -> Token {
        let mut name = String::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                self.bump();
            } else {
                break;
            }
        }

        // `CA$20`, `CN¥100`: an uppercase prefix directly followed by a
        // currency symbol is a money literal.
        if name.len() <= 2 && name.chars().all(|c| c.is_ascii_uppercase()) {
            if let Some(symbol) = self.peek_char() {
                if matches!(symbol, '$' | '£' | '€' | '¥') {
                    return self.lex_money_prefixed(name, start);
                }
            }
        }
        // `NOK#99.50`: a three-letter code followed by `#` and a digit.
        if name.len() == 3
            && name.chars().all(|c| c.is_ascii_uppercase())
            && self.peek_char() == Some('#')
            && self
                .peek_char_at(1)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
        {
            self.bump(); // #
            let scale = crate::types::money::currency_scale(&name);
            return self.lex_money_amount(name, scale, start);
        }

        let kind = match name.as_str() {
            "let" => TokenKind::Let,
            "fn" | "function" => TokenKind::Fn,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "export" => TokenKind::Export,
            "import" => TokenKind::Import,
            "as" => TokenKind::As,
            "try" => TokenKind::Try,
            "check" => TokenKind::Check,
            "stop" => TokenKind::Stop,
            "skip" => TokenKind::Skip,
            "via" => TokenKind::Via,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            _ => TokenKind::Ident(name),
        };
        self.make(kind, start)
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    fn lex_number(&mut self, start: (usize, u32, u32)) -> Token {
        let mut digits = String::new();
        self.read_digits(&mut digits);

        // Fractional part, but never across a `..` range operator.
        if self.peek_char() == Some('.')
            && self
                .peek_char_at(1)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
        {
            self.bump();
            digits.push('.');
            self.read_digits(&mut digits);
            match digits.parse::<f64>() {
                Ok(value) => return self.make(TokenKind::Float(value), start),
                Err(_) => return self.illegal("malformed float literal", start),
            }
        }

        match digits.parse::<i64>() {
            Ok(value) => self.make(TokenKind::Int(value), start),
            Err(_) => self.illegal("integer literal out of range", start),
        }
    }

    pub(crate) fn read_digits(&mut self, out: &mut String) {
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' => {
                    out.push(ch);
                    self.bump();
                }
                '_' => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    // ========================================================================
    // Money
    // ========================================================================

    fn lex_money_symbol(&mut self, start: (usize, u32, u32)) -> Token {
        let symbol = self.bump().unwrap();
        let code = match symbol {
            '$' => "USD",
            '£' => "GBP",
            '€' => "EUR",
            '¥' => "JPY",
            _ => unreachable!(),
        };
        if !self.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            return self.illegal(format!("expected digits after `{symbol}`"), start);
        }
        let scale = crate::types::money::currency_scale(code);
        self.lex_money_amount(code.to_string(), scale, start)
    }

    fn lex_money_prefixed(&mut self, prefix: String, start: (usize, u32, u32)) -> Token {
        let symbol = self.bump().unwrap();
        let code = match (prefix.as_str(), symbol) {
            ("CA", '$') => "CAD",
            ("AU", '$') => "AUD",
            ("HK", '$') => "HKD",
            ("S", '$') => "SGD",
            ("NZ", '$') => "NZD",
            ("CN", '¥') => "CNY",
            _ => {
                return self.illegal(
                    format!("unknown currency prefix `{prefix}{symbol}`"),
                    start,
                )
            }
        };
        if !self.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            return self.illegal(format!("expected digits after `{prefix}{symbol}`"), start);
        }
        let scale = crate::types::money::currency_scale(code);
        self.lex_money_amount(code.to_string(), scale, start)
    }

    fn lex_money_amount(
        &mut self,
        currency: String,
        scale: u8,
        start: (usize, u32, u32),
    ) -> Token {
        let mut whole = String::new();
        self.read_digits(&mut whole);
        let mut fraction = String::new();
        if self.peek_char() == Some('.')
            && self
                .peek_char_at(1)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
        {
            self.bump();
            self.read_digits(&mut fraction);
        }
        if fraction.len() > scale as usize {
            return self.illegal(
                format!("{currency} allows at most {scale} fractional digits"),
                start,
            );
        }
        let Ok(whole) = whole.parse::<i128>() else {
            return self.illegal("money amount out of range", start);
        };
        let mut minor = whole;
        for _ in 0..scale {
            minor *= 10;
        }
        if !fraction.is_empty() {
            let mut padded = fraction.clone();
            while padded.len() < scale as usize {
                padded.push('0');
            }
            minor += padded.parse::<i128>().unwrap_or(0);
        }
        self.make(
            TokenKind::Money(MoneyLit {
                minor,
                currency,
                scale,
            }),
            start,
        )
    }

    // ========================================================================
    // Strings
    // ========================================================================

    /// Double-quoted: escapes only, no interpolation.
    fn lex_double_string(&mut self, start: (usize, u32, u32)) -> Token {
        self.bump(); // "
        let mut out = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return self.illegal("unterminated string", start);
                }
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

    pub(crate) fn escape_char(&mut self) -> Result<char, char> {
        let ch = self.bump().unwrap_or('\0');
        match ch {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '\\' => Ok('\\'),
            '"' => Ok('"'),
            '\'' => Ok('\''),
            '`' => Ok('`'),
            '{' => Ok('{'),
            other => Err(other),
        }
    }

    /// Backtick template: escapes plus `{expr}` interpolation.
    fn lex_template_string(&mut self, start: (usize, u32, u32)) -> Token {
        self.bump(); // `
        let mut parts = Vec::new();
        let mut lit = String::new();
        loop {
            match self.peek_char() {
                None => return self.illegal("unterminated template string", start),
                Some('`') => {
                    self.bump();
                    if !lit.is_empty() {
                        parts.push(StrPart::Lit(lit));
                    }
                    return self.make(TokenKind::TemplateStr(parts), start);
                }
                Some('\\') => {
                    self.bump();
                    match self.escape_char() {
                        Ok(ch) => lit.push(ch),
                        Err(bad) => {
                            return self.illegal(format!("unknown escape `\\{bad}`"), start)
                        }
                    }
                }
                Some('{') => {
                    self.bump();
                    if !lit.is_empty() {
                        parts.push(StrPart::Lit(std::mem::take(&mut lit)));
                    }
                    match self.scan_braced_expr() {
                        Some(expr) => parts.push(StrPart::Expr(expr)),
                        None => return self.illegal("unterminated interpolation", start),
                    }
                }
                Some(ch) => {
                    lit.push(ch);
                    self.bump();
                }
            }
        }
    }

    /// Single-quoted raw string: backslashes are literal; `@{expr}` is the
    /// only interpolation.
    fn lex_raw_string(&mut self, start: (usize, u32, u32)) -> Token {
        self.bump(); // '
        let mut parts = Vec::new();
        let mut lit = String::new();
        loop {
            match self.peek_char() {
                None => return self.illegal("unterminated raw string", start),
                Some('\'') => {
                    self.bump();
                    if !lit.is_empty() {
                        parts.push(StrPart::Lit(lit));
                    }
                    return self.make(TokenKind::RawStr(parts), start);
                }
                Some('@') if self.peek_char_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    if !lit.is_empty() {
                        parts.push(StrPart::Lit(std::mem::take(&mut lit)));
                    }
                    match self.scan_braced_expr() {
                        Some(expr) => parts.push(StrPart::Expr(expr)),
                        None => return self.illegal("unterminated interpolation", start),
                    }
                }
                Some(ch) => {
                    lit.push(ch);
                    self.bump();
                }
            }
        }
    }

    /// Scan the inside of an interpolation hole up to the matching `}`.
    /// Braces nest; string literals may contain braces without closing the
    /// hole. Returns `None` at end of input.
    pub(crate) fn scan_braced_expr(&mut self) -> Option<String> {
        let mut depth = 1usize;
        let mut out = String::new();
        loop {
            let ch = self.peek_char()?;
            match ch {
                '{' => {
                    depth += 1;
                    out.push(ch);
                    self.bump();
                }
                '}' => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return Some(out);
                    }
                    out.push(ch);
                }
                '"' | '\'' | '`' => {
                    let quote = ch;
                    out.push(ch);
                    self.bump();
                    loop {
                        let inner = self.peek_char()?;
                        out.push(inner);
                        self.bump();
                        if inner == '\\' && quote == '"' {
                            if let Some(next) = self.peek_char() {
                                out.push(next);
                                self.bump();
                            }
                            continue;
                        }
                        if inner == quote {
                            break;
                        }
                    }
                }
                _ => {
                    out.push(ch);
                    self.bump();
                }
            }
        }
    }

    // ========================================================================
    // Regex literals
    // ========================================================================

    fn lex_regex(&mut self, start: (usize, u32, u32)) -> Token {
        self.bump(); // /
        let mut pattern = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => return self.illegal("unterminated regex", start),
                Some('\\') => {
                    pattern.push('\\');
                    self.bump();
                    if let Some(ch) = self.peek_char() {
                        pattern.push(ch);
                        self.bump();
                    }
                }
                Some('/') => {
                    self.bump();
                    break;
                }
                Some(ch) => {
                    pattern.push(ch);
                    self.bump();
                }
            }
        }
        let mut flags = String::new();
        while let Some(ch) = self.peek_char() {
            if matches!(ch, 'i' | 'm' | 's' | 'g') {
                flags.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        self.make(TokenKind::Regex { pattern, flags }, start)
    }
}

#[cfg(test)]
mod tests;
