// ABOUTME: Error catalogue for the Basil engine
// Every component emits errors drawn from this catalogue. Each error carries a
// class (which decides whether `try` may intercept it), a stable PREFIX-NNNN
// code, and its origin coordinates.

use crate::value::Value;
use thiserror::Error;

/// Error classes. The first six are catchable by `try`; the rest halt
/// evaluation unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Io,
    Network,
    Database,
    Format,
    Value,
    Security,
    Type,
    Arity,
    Undefined,
    Index,
    Operator,
    Parse,
    State,
    Import,
}

impl ErrorClass {
    pub fn is_catchable(self) -> bool {
        matches!(
            self,
            ErrorClass::Io
                | ErrorClass::Network
                | ErrorClass::Database
                | ErrorClass::Format
                | ErrorClass::Value
                | ErrorClass::Security
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorClass::Io => "io",
            ErrorClass::Network => "network",
            ErrorClass::Database => "database",
            ErrorClass::Format => "format",
            ErrorClass::Value => "value",
            ErrorClass::Security => "security",
            ErrorClass::Type => "type",
            ErrorClass::Arity => "arity",
            ErrorClass::Undefined => "undefined",
            ErrorClass::Index => "index",
            ErrorClass::Operator => "operator",
            ErrorClass::Parse => "parse",
            ErrorClass::State => "state",
            ErrorClass::Import => "import",
        }
    }
}

// ===== Stable error codes =====
// Codes are never reused; retire a code rather than repurposing it.

pub mod codes {
    pub const PARSE_SYNTAX: &str = "PARSE-0001";
    pub const PARSE_ILLEGAL_TOKEN: &str = "PARSE-0002";
    pub const PARSE_UNTERMINATED: &str = "PARSE-0003";
    pub const PARSE_BAD_ESCAPE: &str = "PARSE-0004";
    pub const PARSE_SINGLETON: &str = "PARSE-0005";
    pub const PARSE_SHELL_COMMENT: &str = "PARSE-0006";
    pub const PARSE_BAD_PATTERN: &str = "PARSE-0007";
    pub const PARSE_TAG_MISMATCH: &str = "PARSE-0008";

    pub const TYPE_OPERAND: &str = "TYPE-0001";
    pub const TYPE_NOT_CALLABLE: &str = "TYPE-0002";
    pub const TYPE_NOT_ITERABLE: &str = "TYPE-0003";
    pub const TYPE_ARGUMENT: &str = "TYPE-0004";

    pub const ARITY_MISMATCH: &str = "ARITY-0001";

    pub const UNDEF_NAME: &str = "UNDEF-0001";
    pub const UNDEF_METHOD: &str = "UNDEF-0002";

    pub const INDEX_OUT_OF_BOUNDS: &str = "INDEX-0001";
    pub const INDEX_BAD_KEY: &str = "INDEX-0002";

    pub const OP_UNSUPPORTED: &str = "OP-0001";
    pub const OP_CURRENCY_MISMATCH: &str = "OP-0002";
    pub const OP_DATETIME_COMBINE: &str = "OP-0003";
    pub const OP_DIVISION_BY_ZERO: &str = "OP-0004";

    pub const STATE_INVALID: &str = "STATE-0001";
    pub const STATE_RECURSION: &str = "STATE-0002";
    pub const STATE_DESTRUCTURE: &str = "STATE-0003";

    pub const IMPORT_NOT_FOUND: &str = "IMPORT-0001";
    pub const IMPORT_CYCLE: &str = "IMPORT-0002";
    pub const IMPORT_UNREGISTERED: &str = "IMPORT-0003";

    pub const IO_READ: &str = "IO-0001";
    pub const IO_WRITE: &str = "IO-0002";
    pub const IO_EXEC: &str = "IO-0003";
    pub const IO_CANCELLED: &str = "IO-0099";

    pub const NET_FETCH: &str = "NET-0001";
    pub const NET_BAD_URL: &str = "NET-0002";

    pub const DB_QUERY: &str = "DB-0001";
    pub const DB_DRIVER: &str = "DB-0002";
    pub const DB_CLOSED: &str = "DB-0003";

    pub const FMT_JSON: &str = "FMT-0001";
    pub const FMT_DATETIME: &str = "FMT-0002";
    pub const FMT_NUMBER: &str = "FMT-0003";

    pub const USER_FAIL: &str = "USER-0001";
    pub const VALIDATION: &str = "USER-0002";

    pub const SEC_READ: &str = "SEC-0001";
    pub const SEC_WRITE: &str = "SEC-0002";
    pub const SEC_EXEC: &str = "SEC-0003";
}

/// The engine's error value. `fields` carries structured data supplied by
/// `fail({...})` and the record validation bridge.
#[derive(Error, Debug, Clone)]
#[error("{code}: {message}")]
pub struct Error {
    pub class: ErrorClass,
    pub code: String,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub file: Option<String>,
    pub hints: Vec<String>,
    pub status: Option<i64>,
    pub fields: Vec<(String, Value)>,
}

impl Error {
    pub fn new(class: ErrorClass, code: &str, message: impl Into<String>) -> Self {
        Error {
            class,
            code: code.to_string(),
            message: message.into(),
            line: None,
            column: None,
            file: None,
            hints: Vec::new(),
            status: None,
            fields: Vec::new(),
        }
    }

    pub fn parse(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Parse, code, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Type, codes::TYPE_OPERAND, message)
    }

    pub fn not_callable(what: &str) -> Self {
        Error::new(
            ErrorClass::Type,
            codes::TYPE_NOT_CALLABLE,
            format!("{what} is not callable"),
        )
    }

    pub fn arity(function: &str, expected: &str, actual: usize) -> Self {
        Error::new(
            ErrorClass::Arity,
            codes::ARITY_MISMATCH,
            format!("{function}: expected {expected} arguments, got {actual}"),
        )
    }

    pub fn undefined(name: &str) -> Self {
        Error::new(
            ErrorClass::Undefined,
            codes::UNDEF_NAME,
            format!("undefined name `{name}`"),
        )
    }

    pub fn unknown_method(type_name: &str, method: &str) -> Self {
        Error::new(
            ErrorClass::Undefined,
            codes::UNDEF_METHOD,
            format!("{type_name} has no method `{method}`"),
        )
    }

    pub fn index(message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Index, codes::INDEX_OUT_OF_BOUNDS, message)
    }

    pub fn operator(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Operator, code, message)
    }

    pub fn state(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::State, code, message)
    }

    pub fn import(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Import, code, message)
    }

    pub fn io(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Io, code, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Network, codes::NET_FETCH, message)
    }

    pub fn database(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Database, code, message)
    }

    pub fn format(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Format, code, message)
    }

    pub fn value_error(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Value, code, message)
    }

    pub fn security(code: &str, message: impl Into<String>) -> Self {
        Error::new(ErrorClass::Security, code, message)
    }

    pub fn cancelled() -> Self {
        Error::io(codes::IO_CANCELLED, "evaluation cancelled by host")
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_status(mut self, status: i64) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach origin coordinates if the error does not already carry them.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
            self.column = Some(column);
        }
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        if self.file.is_none() {
            self.file = Some(file.into());
        }
        self
    }

    /// Materialise the error as the dictionary observed by `try` and by the
    /// host-facing report envelope.
    pub fn to_value(&self) -> Value {
        let mut dict = indexmap::IndexMap::new();
        dict.insert(
            crate::config::TYPE_MARKER.to_string(),
            Value::str("error"),
        );
        dict.insert("message".to_string(), Value::str(&self.message));
        dict.insert("code".to_string(), Value::str(&self.code));
        dict.insert("class".to_string(), Value::str(self.class.name()));
        if let Some(status) = self.status {
            dict.insert("status".to_string(), Value::Int(status));
        }
        if let Some(line) = self.line {
            dict.insert("line".to_string(), Value::Int(line as i64));
        }
        if let Some(column) = self.column {
            dict.insert("column".to_string(), Value::Int(column as i64));
        }
        if let Some(ref file) = self.file {
            dict.insert("file".to_string(), Value::str(file));
        }
        if !self.hints.is_empty() {
            let hints = self.hints.iter().map(Value::str).collect();
            dict.insert("hints".to_string(), Value::array(hints));
        }
        for (key, value) in &self.fields {
            dict.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::dict(dict)
    }

    /// JSON report envelope handed to hosts when an error escapes evaluation.
    pub fn to_report(&self) -> serde_json::Value {
        let mut report = serde_json::Map::new();
        report.insert("message".into(), self.message.clone().into());
        report.insert("code".into(), self.code.clone().into());
        report.insert("class".into(), self.class.name().into());
        if let Some(line) = self.line {
            report.insert("line".into(), line.into());
        }
        if let Some(column) = self.column {
            report.insert("column".into(), column.into());
        }
        if let Some(ref file) = self.file {
            report.insert("file".into(), file.clone().into());
        }
        if let Some(status) = self.status {
            report.insert("status".into(), status.into());
        }
        if !self.hints.is_empty() {
            report.insert(
                "hints".into(),
                serde_json::Value::Array(
                    self.hints.iter().map(|h| h.clone().into()).collect(),
                ),
            );
        }
        if !self.fields.is_empty() {
            let mut fields = serde_json::Map::new();
            for (key, value) in &self.fields {
                fields.insert(key.clone(), value.to_json());
            }
            report.insert("fields".into(), serde_json::Value::Object(fields));
        }
        serde_json::Value::Object(report)
    }
}

/// Non-local control flow. `return`, `stop`, and `skip` unwind as sentinels
/// checked after every statement; they never reach the `try` handler.
#[derive(Debug, Clone)]
pub enum Signal {
    Error(Box<Error>),
    Return(Value),
    Stop,
    Skip,
}

impl From<Error> for Signal {
    fn from(err: Error) -> Self {
        Signal::Error(Box::new(err))
    }
}

pub type EvalResult = Result<Value, Signal>;
