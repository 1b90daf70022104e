// ABOUTME: Schemas, records, and the process-wide schema registry
// A schema value carries only its stable id and name; the field rules live in
// a registry so records can reference their schema without creating cycles
// (schemas may point at tables which point back via `via`).

use super::{typed, TYPE_RECORD, TYPE_SCHEMA};
use crate::error::{codes, Error};
use crate::value::{Dict, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static REGISTRY: RefCell<HashMap<String, Value>> = RefCell::new(HashMap::new());
    static NEXT_SERIAL: RefCell<u64> = const { RefCell::new(0) };
}

/// Register a schema's field rules and return the schema value. Field rules
/// are dictionaries like `{type: "string", required: true, min: 3}`.
pub fn define_schema(name: &str, fields: Dict) -> Value {
    let serial = NEXT_SERIAL.with(|n| {
        let mut n = n.borrow_mut();
        *n += 1;
        *n
    });
    let id = format!("schema:{name}:{serial}");
    REGISTRY.with(|registry| {
        registry
            .borrow_mut()
            .insert(id.clone(), Value::dict(fields));
    });
    typed(
        TYPE_SCHEMA,
        vec![("id", Value::str(&id)), ("name", Value::str(name))],
    )
}

pub fn schema_fields(schema_id: &str) -> Option<Value> {
    REGISTRY.with(|registry| registry.borrow().get(schema_id).cloned())
}

pub fn schema_id(schema: &Value) -> Option<String> {
    schema.get_key("id").and_then(|id| id.as_str().map(|s| s.to_string()))
}

/// Construct a record from a schema and a data dictionary. Validation is
/// computed eagerly so `valid()` and `errors()` are cheap reads.
pub fn make_record(schema: &Value, data: Value) -> Result<Value, Error> {
    let id = schema_id(schema).ok_or_else(|| {
        Error::state(codes::STATE_INVALID, "malformed schema value")
    })?;
    let name = schema
        .get_key("name")
        .map(|n| n.to_string())
        .unwrap_or_default();
    let data = match data {
        Value::Dict(_) => data,
        other => {
            return Err(Error::type_error(format!(
                "record data must be a dictionary, got {}",
                other.type_name()
            )))
        }
    };
    let errors = validate(&id, &data);
    Ok(typed(
        TYPE_RECORD,
        vec![
            ("schema", Value::str(&id)),
            ("schemaName", Value::str(name)),
            ("data", data),
            ("errors", Value::array(errors)),
        ],
    ))
}

/// True iff the record was constructed from the given schema.
pub fn record_is(record: &Value, schema: &Value) -> bool {
    let record_schema = record
        .get_key("schema")
        .and_then(|s| s.as_str().map(|s| s.to_string()));
    match (record_schema, schema_id(schema)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Per-field validation errors as `{field, message}` dictionaries.
fn validate(schema_id: &str, data: &Value) -> Vec<Value> {
    let Some(fields) = schema_fields(schema_id) else {
        return Vec::new();
    };
    let Value::Dict(fields) = &fields else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (field, rule) in fields.borrow().iter() {
        if field == crate::config::TYPE_MARKER {
            continue;
        }
        let value = data.get_key(field).unwrap_or(Value::Null);
        for message in check_rule(rule, &value) {
            let mut entry = IndexMap::new();
            entry.insert("field".to_string(), Value::str(field));
            entry.insert("message".to_string(), Value::str(message));
            out.push(Value::dict(entry));
        }
    }
    out
}

fn check_rule(rule: &Value, value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let required = rule
        .get_key("required")
        .map(|r| r.truthy())
        .unwrap_or(false);
    if value.is_null() {
        if required {
            errors.push("is required".to_string());
        }
        return errors;
    }

    if let Some(expected) = rule.get_key("type").and_then(|t| t.as_str().map(String::from)) {
        let ok = match expected.as_str() {
            "string" => matches!(value, Value::Str(_)),
            "int" => matches!(value, Value::Int(_)),
            "float" => value.as_f64().is_some(),
            "bool" => matches!(value, Value::Bool(_)),
            "date" => super::is_typed(value, super::TYPE_DATE)
                || super::is_typed(value, super::TYPE_DATETIME),
            "money" => super::is_typed(value, super::TYPE_MONEY),
            "ref" => true,
            _ => true,
        };
        if !ok {
            errors.push(format!("must be a {expected}"));
        }
    }

    if let Some(min) = rule.get_key("min").and_then(|m| m.as_f64()) {
        let too_small = match value {
            Value::Str(s) => (s.chars().count() as f64) < min,
            other => other.as_f64().map(|n| n < min).unwrap_or(false),
        };
        if too_small {
            errors.push(format!("must be at least {min}"));
        }
    }
    if let Some(max) = rule.get_key("max").and_then(|m| m.as_f64()) {
        let too_large = match value {
            Value::Str(s) => (s.chars().count() as f64) > max,
            other => other.as_f64().map(|n| n > max).unwrap_or(false),
        };
        if too_large {
            errors.push(format!("must be at most {max}"));
        }
    }
    if let Some(pattern) = rule
        .get_key("matches")
        .and_then(|p| p.as_str().map(String::from))
    {
        if let (Some(text), Ok(re)) = (value.as_str(), regex::Regex::new(&pattern)) {
            if !re.is_match(text) {
                errors.push("has an invalid format".to_string());
            }
        }
    }
    if let Some(Value::Array(options)) = rule.get_key("oneOf") {
        if !options.borrow().iter().any(|option| option == value) {
            errors.push("is not an allowed value".to_string());
        }
    }
    errors
}

/// The catchable validation error raised by `failIfInvalid()`.
pub fn validation_error(record: &Value) -> Error {
    let fields = record.get_key("errors").unwrap_or_else(|| Value::array(vec![]));
    let mut err = Error::value_error(codes::VALIDATION, "validation failed").with_status(422);
    err.fields.push(("fields".to_string(), fields));
    err
}
