// ABOUTME: AST node definitions produced by the parser
// Every node keeps its originating token so diagnostics can point at source.

use crate::token::{DatetimeLit, DurationLit, MoneyLit, Token};

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        token: Token,
        pattern: Pattern,
        value: Expr,
    },
    /// Bare `name = expr` and `obj.field = expr` / `xs[i] = expr`.
    Assign {
        token: Token,
        target: AssignTarget,
        value: Expr,
    },
    Return {
        token: Token,
        value: Option<Expr>,
    },
    Check {
        token: Token,
        condition: Expr,
        fallback: Expr,
    },
    Stop {
        token: Token,
    },
    Skip {
        token: Token,
    },
    Export {
        token: Token,
        name: ExportName,
        value: Expr,
    },
    Import {
        token: Token,
        source: Expr,
        alias: Option<String>,
    },
    Expr {
        token: Token,
        expr: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportName {
    Named(String),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Name(String),
    Member { object: Expr, property: String },
    Index { object: Expr, index: Expr },
    Pattern(Pattern),
}

/// One segment of an interpolated literal after sub-parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Lit(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DictKey {
    Ident(String),
    Str(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DictEntry {
    KeyValue(DictKey, Expr),
    /// `{name}` shorthand for `{name: name}`.
    Shorthand(String),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Name(String),
    Discard,
    Array {
        items: Vec<Pattern>,
        rest: Option<String>,
    },
    Dict {
        fields: Vec<DictFieldPattern>,
        rest: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictFieldPattern {
    pub key: String,
    /// `c as alias` renames the binding.
    pub alias: Option<String>,
    /// `b: nested` destructures further.
    pub nested: Option<Pattern>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrefixOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Or,       // or, ||
    SetUnion, // |
    Coalesce, // ??
    And,      // and, &&
    SetIntersect, // &
    Eq,
    NotEq,
    Match,    // ~
    NotMatch, // !~
    In,
    NotIn,
    Is,
    IsNot,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Range,  // ..
    Concat, // ++
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Write,       // ==>
    Append,      // ==>>
    ForceWrite,  // =/=>  (creates missing parent directories)
    ForceAppend, // =/=>>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOp {
    QueryOne,  // <=?=>
    QueryMany, // <=??=>
    Execute,   // <=!=>
    Shell,     // <=#=>
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagAttr {
    /// `name="literal"` or `name='raw'`.
    Literal { name: String, value: String },
    /// `name={expr}`.
    Expr { name: String, value: Expr },
    /// `{...expr}` spreads a dictionary into the attribute map.
    Spread(Expr),
    /// Bare `name` is boolean true.
    Bare(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagChild {
    Tag(TagNode),
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    pub token: Token,
    /// Empty name means a fragment `<> ... </>`.
    pub name: String,
    pub attrs: Vec<TagAttr>,
    pub children: Vec<TagChild>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub spec: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int {
        token: Token,
        value: i64,
    },
    Float {
        token: Token,
        value: f64,
    },
    Str {
        token: Token,
        value: String,
    },
    /// Backtick template and single-quoted raw strings after sub-parsing.
    Interp {
        token: Token,
        pieces: Vec<Piece>,
    },
    Bool {
        token: Token,
        value: bool,
    },
    Null {
        token: Token,
    },
    Regex {
        token: Token,
        pattern: String,
        flags: String,
    },
    Money {
        token: Token,
        lit: MoneyLit,
    },
    Datetime {
        token: Token,
        lit: DatetimeLit,
    },
    Duration {
        token: Token,
        lit: DurationLit,
    },
    PathLit {
        token: Token,
        value: String,
    },
    UrlLit {
        token: Token,
        value: String,
    },
    /// `@(...)` template; classified as path, URL, or datetime at runtime.
    SigilTemplate {
        token: Token,
        pieces: Vec<Piece>,
    },
    /// `@env`, `@args`, `@params`, `@now`, `@today`, `@timeNow`, `@dateNow`,
    /// `@DB`, `@SEARCH`.
    ContextRef {
        token: Token,
        name: String,
    },
    /// `@sqlite(target)`, `@postgres(...)`, `@shell`.
    ConnLit {
        token: Token,
        driver: String,
        target: Option<Box<Expr>>,
    },
    /// `@std/math` and `@basil/...` import references.
    ModuleRef {
        token: Token,
        path: String,
    },
    Ident {
        token: Token,
        name: String,
    },
    Array {
        token: Token,
        elements: Vec<Expr>,
    },
    Dict {
        token: Token,
        entries: Vec<DictEntry>,
    },
    Prefix {
        token: Token,
        op: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        token: Token,
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index {
        token: Token,
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    Slice {
        token: Token,
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    Member {
        token: Token,
        object: Box<Expr>,
        property: String,
    },
    Call {
        token: Token,
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Function {
        token: Token,
        name: Option<String>,
        params: Vec<Param>,
        body: Block,
    },
    Block {
        token: Token,
        body: Block,
    },
    If {
        token: Token,
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    /// Iteration form; returns the collected, null-filtered array.
    For {
        token: Token,
        key: Option<Pattern>,
        value: Pattern,
        iterable: Box<Expr>,
        body: Block,
    },
    /// Mapping form `for (xs) f`, equivalent to `xs.map(f)`.
    ForMap {
        token: Token,
        iterable: Box<Expr>,
        mapper: Box<Expr>,
    },
    Try {
        token: Token,
        call: Box<Expr>,
    },
    Tag {
        token: Token,
        node: TagNode,
    },
    /// `expr ==> target` and friends.
    WriteFile {
        token: Token,
        mode: WriteMode,
        value: Box<Expr>,
        target: Box<Expr>,
    },
    /// `<== source`; reads a path or fetches a URL depending on the operand.
    Read {
        token: Token,
        source: Box<Expr>,
    },
    /// `sql <=?=> conn` and friends.
    Db {
        token: Token,
        op: DbOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    SchemaDecl {
        token: Token,
        name: String,
        fields: Vec<SchemaField>,
    },
    /// `@query(source) { clauses }`, `@insert(target) { row }`, ...
    QueryDsl {
        token: Token,
        verb: String,
        source: Option<Box<Expr>>,
        clauses: Vec<(String, Expr)>,
    },
}

impl Expr {
    pub fn token(&self) -> &Token {
        match self {
            Expr::Int { token, .. }
            | Expr::Float { token, .. }
            | Expr::Str { token, .. }
            | Expr::Interp { token, .. }
            | Expr::Bool { token, .. }
            | Expr::Null { token }
            | Expr::Regex { token, .. }
            | Expr::Money { token, .. }
            | Expr::Datetime { token, .. }
            | Expr::Duration { token, .. }
            | Expr::PathLit { token, .. }
            | Expr::UrlLit { token, .. }
            | Expr::SigilTemplate { token, .. }
            | Expr::ContextRef { token, .. }
            | Expr::ConnLit { token, .. }
            | Expr::ModuleRef { token, .. }
            | Expr::Ident { token, .. }
            | Expr::Array { token, .. }
            | Expr::Dict { token, .. }
            | Expr::Prefix { token, .. }
            | Expr::Infix { token, .. }
            | Expr::Index { token, .. }
            | Expr::Slice { token, .. }
            | Expr::Member { token, .. }
            | Expr::Call { token, .. }
            | Expr::Function { token, .. }
            | Expr::Block { token, .. }
            | Expr::If { token, .. }
            | Expr::For { token, .. }
            | Expr::ForMap { token, .. }
            | Expr::Try { token, .. }
            | Expr::Tag { token, .. }
            | Expr::WriteFile { token, .. }
            | Expr::Read { token, .. }
            | Expr::Db { token, .. }
            | Expr::SchemaDecl { token, .. }
            | Expr::QueryDsl { token, .. } => token,
        }
    }
}

impl Stmt {
    pub fn token(&self) -> &Token {
        match self {
            Stmt::Let { token, .. }
            | Stmt::Assign { token, .. }
            | Stmt::Return { token, .. }
            | Stmt::Check { token, .. }
            | Stmt::Stop { token }
            | Stmt::Skip { token }
            | Stmt::Export { token, .. }
            | Stmt::Import { token, .. }
            | Stmt::Expr { token, .. } => token,
        }
    }
}
