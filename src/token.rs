// ABOUTME: Token kinds produced by the lexer
// Each token carries its kind, verbatim lexeme, and origin coordinates.
// Literal kinds carry pre-parsed payloads so the parser never re-scans text.

use chrono::{NaiveDate, NaiveTime};
use std::fmt;

/// One segment of an interpolated literal. Expression segments hold the raw
/// source text between the braces; the parser runs a sub-parse over it.
#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    Lit(String),
    Expr(String),
}

/// Pre-parsed money payload. `minor` is the amount in the currency's minor
/// unit; `scale` is the currency's declared number of fractional digits.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyLit {
    pub minor: i128,
    pub currency: String,
    pub scale: u8,
}

/// Pre-parsed datetime payload. A literal may carry a date, a time, or both;
/// the offset is minutes east of UTC when the literal spelled one.
#[derive(Debug, Clone, PartialEq)]
pub struct DatetimeLit {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub offset_minutes: Option<i32>,
}

/// Pre-parsed duration payload. Calendar units (years, months) are kept
/// apart from fixed units because their length depends on the anchor date.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationLit {
    pub negative: bool,
    pub months: i64,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    TemplateStr(Vec<StrPart>),
    RawStr(Vec<StrPart>),
    Money(MoneyLit),
    Datetime(DatetimeLit),
    Duration(DurationLit),
    PathLit(String),
    UrlLit(String),
    SigilTemplate(Vec<StrPart>),
    Regex { pattern: String, flags: String },
    True,
    False,
    Null,

    Ident(String),
    Underscore,

    // Sigil references
    ContextRef(String),  // @env @args @params @now @today @timeNow @dateNow @DB @SEARCH
    ConnDriver(String),  // @sqlite @postgres @mysql @sftp @shell
    QueryVerb(String),   // @schema @query @insert @update @delete @transaction
    StdRef(String),      // @std/math
    BasilRef(String),    // @basil/auth

    // Keywords
    Let,
    Fn,
    If,
    Else,
    For,
    In,
    Return,
    Export,
    Import,
    As,
    Try,
    Check,
    Stop,
    Skip,
    Via,
    And,
    Or,
    Not,
    Is,

    // Operators and punctuation
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    DotDot,
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Tilde,
    NotTilde,
    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Coalesce,
    Bang,
    Question,
    Dot,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Ellipsis,

    // File and database operators
    WriteTo,       // ==>
    AppendTo,      // ==>>
    ForceWriteTo,  // =/=>
    ForceAppendTo, // =/=>>
    ReadFrom,      // <==
    QueryOne,      // <=?=>
    QueryMany,     // <=??=>
    ExecOn,        // <=!=>
    ShellOn,       // <=#=>

    // Tag tokens
    TagStart(String), // <name
    TagEnd,           // > closing an open-tag header
    TagSelfClose,     // />
    TagClose(String), // </name>
    FragmentStart,    // <>
    FragmentClose,    // </>
    Text(String),     // raw text between tags

    Eof,
    Illegal(String),
}

impl TokenKind {
    /// True when a token of this kind can end a value, which makes a
    /// following `<` a comparison and a following `/` a division.
    pub fn ends_value(&self) -> bool {
        matches!(
            self,
            TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::TemplateStr(_)
                | TokenKind::RawStr(_)
                | TokenKind::Money(_)
                | TokenKind::Datetime(_)
                | TokenKind::Duration(_)
                | TokenKind::PathLit(_)
                | TokenKind::UrlLit(_)
                | TokenKind::SigilTemplate(_)
                | TokenKind::Regex { .. }
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Ident(_)
                | TokenKind::ContextRef(_)
                | TokenKind::StdRef(_)
                | TokenKind::BasilRef(_)
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::TagSelfClose
                | TokenKind::TagClose(_)
                | TokenKind::FragmentClose
        )
    }

    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Int(n) => format!("integer `{n}`"),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Illegal(what) => format!("illegal input `{what}`"),
            other => format!("{other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Token {
    pub fn eof(line: u32, column: u32, offset: usize) -> Self {
        Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.kind.describe(), self.line, self.column)
    }
}
