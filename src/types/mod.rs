// ABOUTME: Typed-dictionary machinery
// Datetime, duration, money, path, URL, regex, file, response, connection,
// schema, record, table, and tag values are dictionaries carrying a reserved
// `__type` marker. Constructors, printing, and coercion live here; method
// tables live in `crate::methods`.

pub mod datetime;
pub mod money;
pub mod schema;

use crate::config::TYPE_MARKER;
use crate::value::{Dict, Value};
use indexmap::IndexMap;

pub const TYPE_DATETIME: &str = "datetime";
pub const TYPE_DATE: &str = "date";
pub const TYPE_TIME: &str = "time";
pub const TYPE_DURATION: &str = "duration";
pub const TYPE_MONEY: &str = "money";
pub const TYPE_PATH: &str = "path";
pub const TYPE_URL: &str = "url";
pub const TYPE_REGEX: &str = "regex";
pub const TYPE_FILE: &str = "file";
pub const TYPE_RESPONSE: &str = "response";
pub const TYPE_CONNECTION: &str = "connection";
pub const TYPE_CURSOR: &str = "cursor";
pub const TYPE_SCHEMA: &str = "schema";
pub const TYPE_RECORD: &str = "record";
pub const TYPE_TABLE: &str = "table";
pub const TYPE_TAG: &str = "tag";
pub const TYPE_ERROR: &str = "error";

/// Build a typed dictionary from (key, value) pairs.
pub fn typed(tag: &str, entries: Vec<(&str, Value)>) -> Value {
    let mut dict = IndexMap::new();
    dict.insert(TYPE_MARKER.to_string(), Value::str(tag));
    for (key, value) in entries {
        dict.insert(key.to_string(), value);
    }
    Value::dict(dict)
}

pub fn is_typed(value: &Value, tag: &str) -> bool {
    value.type_marker().as_deref() == Some(tag)
}

pub fn path_value(path: impl Into<String>) -> Value {
    typed(TYPE_PATH, vec![("value", Value::str(path.into()))])
}

pub fn url_value(url: impl Into<String>) -> Value {
    typed(TYPE_URL, vec![("value", Value::str(url.into()))])
}

pub fn regex_value(pattern: impl Into<String>, flags: impl Into<String>) -> Value {
    typed(
        TYPE_REGEX,
        vec![
            ("pattern", Value::str(pattern.into())),
            ("flags", Value::str(flags.into())),
        ],
    )
}

pub fn connection_value(driver: &str, target: &str, handle: Option<u64>) -> Value {
    typed(
        TYPE_CONNECTION,
        vec![
            ("driver", Value::str(driver)),
            ("target", Value::str(target)),
            (
                "handle",
                handle.map(|h| Value::Int(h as i64)).unwrap_or(Value::Null),
            ),
        ],
    )
}

pub fn file_value(path: &str, contents: &str) -> Value {
    typed(
        TYPE_FILE,
        vec![
            ("path", Value::str(path)),
            ("contents", Value::str(contents)),
            ("size", Value::Int(contents.len() as i64)),
        ],
    )
}

pub fn response_value(status: u16, headers: Vec<(String, String)>, body: &str) -> Value {
    let mut header_dict = IndexMap::new();
    for (name, value) in headers {
        header_dict.insert(name.to_lowercase(), Value::str(value));
    }
    typed(
        TYPE_RESPONSE,
        vec![
            ("status", Value::Int(status as i64)),
            ("headers", Value::dict(header_dict)),
            ("body", Value::str(body)),
            ("ok", Value::Bool((200..300).contains(&status))),
        ],
    )
}

pub fn table_value(rows: Vec<Value>, name: Option<&str>, schema_id: Option<&str>) -> Value {
    typed(
        TYPE_TABLE,
        vec![
            ("rows", Value::array(rows)),
            ("name", name.map(Value::str).unwrap_or(Value::Null)),
            ("schema", schema_id.map(Value::str).unwrap_or(Value::Null)),
        ],
    )
}

pub fn tag_value(name: &str, attributes: Dict, children: Vec<Value>, self_closing: bool) -> Value {
    typed(
        TYPE_TAG,
        vec![
            ("name", Value::str(name)),
            ("attributes", Value::dict(attributes)),
            ("children", Value::array(children)),
            ("selfClosing", Value::Bool(self_closing)),
        ],
    )
}

/// Compile the regex held by a regex dictionary. The `g` flag is handled by
/// the caller (it selects replace-all / match-all); `imsx` map onto builder
/// options.
pub fn compile_regex(value: &Value) -> Option<regex::Regex> {
    let pattern = value.get_key("pattern")?;
    let pattern = pattern.as_str()?;
    let flags = value
        .get_key("flags")
        .and_then(|f| f.as_str().map(|s| s.to_string()))
        .unwrap_or_default();
    regex::RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .ok()
}

/// Printing rules for typed dictionaries; `None` falls back to the generic
/// dictionary printer.
pub fn display_typed(value: &Value) -> Option<String> {
    let tag = value.type_marker()?;
    match tag.as_str() {
        TYPE_DATE | TYPE_TIME | TYPE_DATETIME => value
            .get_key("iso")
            .and_then(|iso| iso.as_str().map(|s| s.to_string())),
        TYPE_DURATION => Some(datetime::format_duration(value)),
        TYPE_MONEY => Some(money::format_money(value)),
        TYPE_PATH | TYPE_URL => value
            .get_key("value")
            .and_then(|v| v.as_str().map(|s| s.to_string())),
        TYPE_REGEX => {
            let pattern = value.get_key("pattern")?;
            let flags = value.get_key("flags")?;
            Some(format!("/{pattern}/{flags}"))
        }
        TYPE_TAG => Some(crate::render::render_value(value)),
        TYPE_ERROR => value
            .get_key("message")
            .map(|message| message.to_string()),
        TYPE_CONNECTION => {
            let driver = value.get_key("driver")?;
            let target = value.get_key("target")?;
            Some(format!("<connection {driver}:{target}>"))
        }
        TYPE_SCHEMA => {
            let name = value.get_key("name")?;
            Some(format!("<schema {name}>"))
        }
        TYPE_RECORD => None,
        TYPE_TABLE => {
            let rows = value.get_key("rows")?;
            if let Value::Array(items) = rows {
                Some(format!("<table {} rows>", items.borrow().len()))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_identifies_typed_dicts() {
        let path = path_value("./src");
        assert!(is_typed(&path, TYPE_PATH));
        assert_eq!(path.type_name(), "path");
        assert!(!is_typed(&path, TYPE_URL));
    }

    #[test]
    fn test_path_prints_bare() {
        assert_eq!(path_value("./a/b").to_string(), "./a/b");
    }

    #[test]
    fn test_regex_compilation_honours_flags() {
        let re = compile_regex(&regex_value("^ab$", "i")).unwrap();
        assert!(re.is_match("AB"));
        assert!(compile_regex(&regex_value("(", "")).is_none());
    }

    #[test]
    fn test_response_ok_flag() {
        let ok = response_value(204, vec![], "");
        assert_eq!(ok.get_key("ok"), Some(Value::Bool(true)));
        let not_found = response_value(404, vec![], "");
        assert_eq!(not_found.get_key("ok"), Some(Value::Bool(false)));
    }
}
