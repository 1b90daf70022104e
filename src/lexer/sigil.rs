// ABOUTME: Sigil literals — everything introduced by `@`
// Dispatches on what follows the sigil: digits become datetimes, times, or
// durations; path prefixes become paths; URL schemes become URLs; `(` opens
// an interpolated template; a recognised keyword becomes a context reference,
// connection driver, query verb, or module reference.

use super::Lexer;
use crate::token::{DatetimeLit, DurationLit, Token, TokenKind};
use chrono::{NaiveDate, NaiveTime};

const URL_SCHEMES: &[&str] = &["https", "http", "ftp", "file", "wss", "ws", "ssh"];

/// Characters that end a bare path or URL literal.
fn is_literal_end(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '"' | '\'' | '`' | ')' | ']' | '}' | ',' | ';' | '<' | '>'
        )
}

impl<'a> Lexer<'a> {
    pub(crate) fn lex_sigil(&mut self, start: (usize, u32, u32)) -> Token {
        self.bump(); // @
        match self.peek_char() {
            Some('(') => self.lex_sigil_template(start),
            Some('.') | Some('/') | Some('~') => self.lex_path(start),
            Some('-') if self
                .peek_char_at(1)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false) =>
            {
                self.bump();
                self.lex_temporal(start, true)
            }
            Some(ch) if ch.is_ascii_digit() => self.lex_temporal(start, false),
            Some(ch) if ch.is_ascii_alphabetic() => self.lex_sigil_keyword(start),
            _ => self.illegal("dangling `@`", start),
        }
    }

    // ------------------------------------------------------------------------
    // Paths and URLs
    // ------------------------------------------------------------------------

    fn lex_path(&mut self, start: (usize, u32, u32)) -> Token {
        let mut path = String::new();
        while let Some(ch) = self.peek_char() {
            if is_literal_end(ch) {
                break;
            }
            path.push(ch);
            self.bump();
        }
        self.make(TokenKind::PathLit(path), start)
    }

    fn lex_url(&mut self, scheme: String, start: (usize, u32, u32)) -> Token {
        let mut url = scheme;
        while let Some(ch) = self.peek_char() {
            if is_literal_end(ch) {
                break;
            }
            url.push(ch);
            self.bump();
        }
        self.make(TokenKind::UrlLit(url), start)
    }

    // ------------------------------------------------------------------------
    // `@(...)` templates
    // ------------------------------------------------------------------------

    fn lex_sigil_template(&mut self, start: (usize, u32, u32)) -> Token {
        use crate::token::StrPart;
        self.bump(); // (
        let mut parts = Vec::new();
        let mut lit = String::new();
        let mut depth = 1usize;
        loop {
            match self.peek_char() {
                None => return self.illegal("unterminated `@(` template", start),
                Some('(') => {
                    depth += 1;
                    lit.push('(');
                    self.bump();
                }
                Some(')') => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        if !lit.is_empty() {
                            parts.push(StrPart::Lit(lit));
                        }
                        return self.make(TokenKind::SigilTemplate(parts), start);
                    }
                    lit.push(')');
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

    // ------------------------------------------------------------------------
    // Sigil keywords
    // ------------------------------------------------------------------------

    fn lex_sigil_keyword(&mut self, start: (usize, u32, u32)) -> Token {
        // URL schemes are checked against the raw source so `@https://...`
        // never half-lexes as an identifier.
        for scheme in URL_SCHEMES {
            let with_separator = format!("{scheme}://");
            if self.starts_with(&with_separator) {
                self.eat(&with_separator);
                return self.lex_url(with_separator, start);
            }
        }

        let mut name = String::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                self.bump();
            } else {
                break;
            }
        }

        match name.as_str() {
            "now" | "today" | "timeNow" | "dateNow" | "env" | "args" | "params" | "DB"
            | "SEARCH" => self.make(TokenKind::ContextRef(name), start),
            "sqlite" | "postgres" | "mysql" | "sftp" | "shell" => {
                self.make(TokenKind::ConnDriver(name), start)
            }
            "schema" | "query" | "insert" | "update" | "delete" | "transaction" => {
                self.make(TokenKind::QueryVerb(name), start)
            }
            "std" | "basil" => {
                if self.peek_char() != Some('/') {
                    return self.illegal(format!("`@{name}` requires a module path"), start);
                }
                self.bump(); // /
                let mut path = String::new();
                while let Some(ch) = self.peek_char() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '/' || ch == '-' {
                        path.push(ch);
                        self.bump();
                    } else {
                        break;
                    }
                }
                if path.is_empty() {
                    return self.illegal(format!("`@{name}/` requires a module name"), start);
                }
                let kind = if name == "std" {
                    TokenKind::StdRef(path)
                } else {
                    TokenKind::BasilRef(path)
                };
                self.make(kind, start)
            }
            other => self.illegal(format!("unknown sigil `@{other}`"), start),
        }
    }

    // ------------------------------------------------------------------------
    // Datetimes, times, and durations
    // ------------------------------------------------------------------------

    fn lex_temporal(&mut self, start: (usize, u32, u32), negative: bool) -> Token {
        let mut digits = String::new();
        self.read_digits(&mut digits);

        if !negative && digits.len() == 4 && self.peek_char() == Some('-') {
            return self.lex_datetime(digits, start);
        }
        if !negative && self.peek_char() == Some(':') {
            return self.lex_time_only(digits, start);
        }
        self.lex_duration(digits, negative, start)
    }

    fn lex_datetime(&mut self, year: String, start: (usize, u32, u32)) -> Token {
        self.bump(); // -
        let mut month = String::new();
        self.read_digits(&mut month);
        if !self.eat("-") {
            return self.illegal("malformed date, expected YYYY-MM-DD", start);
        }
        let mut day = String::new();
        self.read_digits(&mut day);

        let date = match (
            year.parse::<i32>(),
            month.parse::<u32>(),
            day.parse::<u32>(),
        ) {
            (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        };
        let Some(date) = date else {
            return self.illegal(format!("invalid date {year}-{month}-{day}"), start);
        };

        let mut lit = DatetimeLit {
            date: Some(date),
            time: None,
            offset_minutes: None,
        };

        if self.peek_char() == Some('T') {
            self.bump();
            let Some(time) = self.read_time() else {
                return self.illegal("malformed time in datetime", start);
            };
            lit.time = Some(time);

            // Optional zone: Z or ±HH:MM.
            match self.peek_char() {
                Some('Z') => {
                    self.bump();
                    lit.offset_minutes = Some(0);
                }
                Some(sign @ ('+' | '-')) => {
                    if self
                        .peek_char_at(1)
                        .map(|c| c.is_ascii_digit())
                        .unwrap_or(false)
                    {
                        self.bump();
                        let mut hh = String::new();
                        self.read_digits(&mut hh);
                        let mut mm = String::new();
                        if self.eat(":") {
                            self.read_digits(&mut mm);
                        }
                        let hours = hh.parse::<i32>().unwrap_or(0);
                        let minutes = mm.parse::<i32>().unwrap_or(0);
                        let total = hours * 60 + minutes;
                        lit.offset_minutes =
                            Some(if sign == '-' { -total } else { total });
                    }
                }
                _ => {}
            }
        }
        self.make(TokenKind::Datetime(lit), start)
    }

    fn lex_time_only(&mut self, hours: String, start: (usize, u32, u32)) -> Token {
        self.bump(); // :
        let mut minutes = String::new();
        self.read_digits(&mut minutes);
        let mut seconds = String::new();
        if self.peek_char() == Some(':') {
            self.bump();
            self.read_digits(&mut seconds);
        }
        let time = build_time(&hours, &minutes, &seconds, "");
        let Some(time) = time else {
            return self.illegal("invalid time literal", start);
        };
        self.make(
            TokenKind::Datetime(DatetimeLit {
                date: None,
                time: Some(time),
                offset_minutes: None,
            }),
            start,
        )
    }

    /// HH:MM[:SS[.fff]] inside a full datetime.
    fn read_time(&mut self) -> Option<NaiveTime> {
        let mut hours = String::new();
        self.read_digits(&mut hours);
        if !self.eat(":") {
            return None;
        }
        let mut minutes = String::new();
        self.read_digits(&mut minutes);
        let mut seconds = String::new();
        let mut fraction = String::new();
        if self.peek_char() == Some(':') {
            self.bump();
            self.read_digits(&mut seconds);
            if self.peek_char() == Some('.')
                && self
                    .peek_char_at(1)
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false)
            {
                self.bump();
                self.read_digits(&mut fraction);
            }
        }
        build_time(&hours, &minutes, &seconds, &fraction)
    }

    fn lex_duration(
        &mut self,
        first_count: String,
        negative: bool,
        start: (usize, u32, u32),
    ) -> Token {
        let mut months: i64 = 0;
        let mut seconds: i64 = 0;
        let mut count = first_count;
        loop {
            let unit = self.read_duration_unit();
            let Some(unit) = unit else {
                return self.illegal(
                    "malformed duration, expected a unit (y, mo, w, d, h, m, s)",
                    start,
                );
            };
            let Ok(n) = count.parse::<i64>() else {
                return self.illegal("duration count out of range", start);
            };
            match unit {
                "y" => months += n * 12,
                "mo" => months += n,
                "w" => seconds += n * 604_800,
                "d" => seconds += n * 86_400,
                "h" => seconds += n * 3_600,
                "m" => seconds += n * 60,
                "s" => seconds += n,
                _ => unreachable!(),
            }
            if self.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                count = String::new();
                self.read_digits(&mut count);
            } else {
                break;
            }
        }
        self.make(
            TokenKind::Duration(DurationLit {
                negative,
                months,
                seconds,
            }),
            start,
        )
    }

    fn read_duration_unit(&mut self) -> Option<&'static str> {
        if self.starts_with("mo") {
            self.eat("mo");
            return Some("mo");
        }
        match self.peek_char() {
            Some('y') => {
                self.bump();
                Some("y")
            }
            Some('w') => {
                self.bump();
                Some("w")
            }
            Some('d') => {
                self.bump();
                Some("d")
            }
            Some('h') => {
                self.bump();
                Some("h")
            }
            Some('m') => {
                self.bump();
                Some("m")
            }
            Some('s') => {
                self.bump();
                Some("s")
            }
            _ => None,
        }
    }
}

fn build_time(hours: &str, minutes: &str, seconds: &str, fraction: &str) -> Option<NaiveTime> {
    let h = hours.parse::<u32>().ok()?;
    let m = minutes.parse::<u32>().ok()?;
    let s = if seconds.is_empty() {
        0
    } else {
        seconds.parse::<u32>().ok()?
    };
    let millis = if fraction.is_empty() {
        0
    } else {
        let mut padded = fraction.to_string();
        padded.truncate(3);
        while padded.len() < 3 {
            padded.push('0');
        }
        padded.parse::<u32>().ok()?
    };
    NaiveTime::from_hms_milli_opt(h, m, s, millis)
}
