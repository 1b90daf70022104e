// ABOUTME: Schema, record, and table method tables
// Records expose the validation bridge: valid(), errors(), and
// failIfInvalid(), which raises a catchable validation error carrying a
// per-field `fields` array.

use super::{want_exact, want_int, want_str};
use crate::env::Environment;
use crate::error::Error;
use crate::eval::call_value;
use crate::eval::ops::compare;
use crate::types::{self, schema};
use crate::value::Value;
use std::rc::Rc;

pub(super) fn try_invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Option<Result<Value, Error>> {
    match receiver.type_marker().as_deref() {
        Some(types::TYPE_SCHEMA) => Some(dispatch_schema(receiver, method, args)),
        Some(types::TYPE_RECORD) => dispatch_record(receiver, method, args),
        Some(types::TYPE_TABLE) => Some(dispatch_table(receiver, method, args, env)),
        _ => None,
    }
}

fn dispatch_schema(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    match method {
        "name" => {
            want_exact(method, args, 0)?;
            Ok(receiver.get_key("name").unwrap_or(Value::Null))
        }
        "fields" => {
            want_exact(method, args, 0)?;
            let id = schema::schema_id(receiver).unwrap_or_default();
            Ok(schema::schema_fields(&id).unwrap_or_else(Value::empty_dict))
        }
        "validate" => {
            want_exact(method, args, 1)?;
            let record = schema::make_record(receiver, args[0].clone())?;
            Ok(record.get_key("errors").unwrap_or_else(|| Value::array(vec![])))
        }
        _ => Err(Error::unknown_method("schema", method)),
    }
}

/// Returns None for unknown names so record data keys stay reachable
/// through the generic dictionary table.
fn dispatch_record(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    let result = match method {
        "valid" => want_exact(method, args, 0).map(|_| {
            let errors = receiver.get_key("errors");
            let is_valid = match &errors {
                Some(Value::Array(items)) => items.borrow().is_empty(),
                _ => true,
            };
            Value::Bool(is_valid)
        }),
        "errors" => want_exact(method, args, 0)
            .map(|_| receiver.get_key("errors").unwrap_or_else(|| Value::array(vec![]))),
        "failIfInvalid" => want_exact(method, args, 0).and_then(|_| {
            let has_errors = match receiver.get_key("errors") {
                Some(Value::Array(items)) => !items.borrow().is_empty(),
                _ => false,
            };
            if has_errors {
                Err(schema::validation_error(receiver))
            } else {
                Ok(Value::Null)
            }
        }),
        "data" => want_exact(method, args, 0)
            .map(|_| receiver.get_key("data").unwrap_or_else(Value::empty_dict)),
        "toJSON" => want_exact(method, args, 0).map(|_| {
            let data = receiver.get_key("data").unwrap_or_else(Value::empty_dict);
            Value::str(serde_json::to_string(&data.to_json()).unwrap_or_default())
        }),
        _ => return None,
    };
    Some(result)
}

fn dispatch_table(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    let rows: Vec<Value> = match receiver.get_key("rows") {
        Some(Value::Array(items)) => items.borrow().clone(),
        _ => Vec::new(),
    };
    match method {
        "all" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(rows))
        }
        "first" => {
            want_exact(method, args, 0)?;
            Ok(rows.into_iter().next().unwrap_or(Value::Null))
        }
        "count" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(rows.len() as i64))
        }
        "where" => {
            want_exact(method, args, 1)?;
            let mut kept = Vec::new();
            for row in rows {
                if call_value(&args[0], &[row.clone()], env)?.truthy() {
                    kept.push(row);
                }
            }
            Ok(table_like(receiver, kept))
        }
        "orderBy" => {
            let key = want_str(method, args, 0)?;
            let (key, descending) = match key.strip_prefix('-') {
                Some(key) => (key.to_string(), true),
                None => (key.to_string(), false),
            };
            let mut sorted = rows;
            sorted.sort_by(|a, b| {
                let left = field(a, &key);
                let right = field(b, &key);
                let ord = compare(&left, &right).unwrap_or(std::cmp::Ordering::Equal);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
            Ok(table_like(receiver, sorted))
        }
        "limit" => {
            let n = want_int(method, args, 0)?.max(0) as usize;
            let mut rows = rows;
            rows.truncate(n);
            Ok(table_like(receiver, rows))
        }
        "insert" => {
            want_exact(method, args, 1)?;
            let row = args[0].clone();
            if let Some(Value::Array(items)) = receiver.get_key("rows") {
                items.borrow_mut().push(row.clone());
            }
            Ok(row)
        }
        "toJSON" => {
            want_exact(method, args, 0)?;
            let json = Value::array(rows).to_json();
            Ok(Value::str(serde_json::to_string(&json).unwrap_or_default()))
        }
        _ => Err(Error::unknown_method("table", method)),
    }
}

fn field(row: &Value, key: &str) -> Value {
    if types::is_typed(row, types::TYPE_RECORD) {
        if let Some(data) = row.get_key("data") {
            return data.get_key(key).unwrap_or(Value::Null);
        }
    }
    row.get_key(key).unwrap_or(Value::Null)
}

/// A derived table keeps the source's name and schema.
fn table_like(source: &Value, rows: Vec<Value>) -> Value {
    let name = source.get_key("name").and_then(|n| match n {
        Value::Str(s) => Some(s),
        _ => None,
    });
    let schema_id = source.get_key("schema").and_then(|s| match s {
        Value::Str(s) => Some(s),
        _ => None,
    });
    types::table_value(rows, name.as_deref(), schema_id.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Context;
    use indexmap::IndexMap;

    fn env() -> Rc<Environment> {
        Environment::root(Context::minimal())
    }

    fn row(name: &str, age: i64) -> Value {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::str(name));
        map.insert("age".to_string(), Value::Int(age));
        Value::dict(map)
    }

    #[test]
    fn test_table_order_and_limit() {
        let table = types::table_value(
            vec![row("b", 2), row("a", 1), row("c", 3)],
            Some("users"),
            None,
        );
        let ordered = dispatch_table(&table, "orderBy", &[Value::str("name")], &env()).unwrap();
        let first = dispatch_table(&ordered, "first", &[], &env()).unwrap();
        assert_eq!(first.get_key("name"), Some(Value::str("a")));

        let limited = dispatch_table(&table, "limit", &[Value::Int(2)], &env()).unwrap();
        assert_eq!(
            dispatch_table(&limited, "count", &[], &env()).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_descending_order() {
        let table = types::table_value(vec![row("a", 1), row("b", 2)], None, None);
        let ordered = dispatch_table(&table, "orderBy", &[Value::str("-age")], &env()).unwrap();
        let first = dispatch_table(&ordered, "first", &[], &env()).unwrap();
        assert_eq!(first.get_key("age"), Some(Value::Int(2)));
    }

    #[test]
    fn test_insert_mutates_rows() {
        let table = types::table_value(vec![], None, None);
        dispatch_table(&table, "insert", &[row("x", 9)], &env()).unwrap();
        assert_eq!(
            dispatch_table(&table, "count", &[], &env()).unwrap(),
            Value::Int(1)
        );
    }
}
