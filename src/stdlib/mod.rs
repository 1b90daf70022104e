// ABOUTME: Standard library — fixed `std/...` modules of built-in functions
// Modules are built once per thread and cached; the table is read-only after
// first population. Global builtins (`fail`, `print`, `type`) are registered
// on every root environment.

pub mod api;
pub mod dev;
pub mod html;
pub mod id;
pub mod markdown;
pub mod math;
pub mod schema;
pub mod valid;

use crate::env::Environment;
use crate::error::{codes, Error};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

thread_local! {
    static MODULES: RefCell<HashMap<String, Value>> = RefCell::new(HashMap::new());
}

/// Look up a `std/{name}` module, building it on first use.
pub fn module(name: &str) -> Option<Value> {
    if let Some(cached) = MODULES.with(|modules| modules.borrow().get(name).cloned()) {
        return Some(cached);
    }
    let built = match name {
        "math" => math::build(),
        "valid" => valid::build(),
        "id" => id::build(),
        "schema" => schema::build(),
        "markdown" => markdown::build(),
        "html" => html::build(),
        "dev" => dev::build(),
        "api" => api::build(),
        _ => return None,
    };
    MODULES.with(|modules| {
        modules
            .borrow_mut()
            .insert(name.to_string(), built.clone())
    });
    Some(built)
}

/// Builtins visible in every scope.
pub fn register_globals(env: &Rc<Environment>) {
    env.define("fail", Value::builtin("fail", "1", builtin_fail));
    env.define("print", Value::builtin("print", "0+", builtin_print));
    env.define("type", Value::builtin("type", "1", builtin_type));
}

/// `fail("msg")` or `fail({message, code?, status?, ...})` raises a
/// catchable value-class error; extra dictionary fields pass through to the
/// caller's error dictionary.
fn builtin_fail(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let payload = args.first().cloned().unwrap_or(Value::Null);
    match &payload {
        Value::Dict(map) => {
            let message = payload
                .get_key("message")
                .map(|m| m.to_string())
                .unwrap_or_else(|| "failed".to_string());
            let code = payload
                .get_key("code")
                .map(|c| c.to_string())
                .unwrap_or_else(|| codes::USER_FAIL.to_string());
            let mut err = Error::value_error(&code, message);
            if let Some(status) = payload.get_key("status").and_then(|s| s.as_int()) {
                err = err.with_status(status);
            }
            for (key, value) in map.borrow().iter() {
                if matches!(key.as_str(), "message" | "code" | "status") {
                    continue;
                }
                err.fields.push((key.clone(), value.clone()));
            }
            Err(err)
        }
        other => Err(Error::value_error(codes::USER_FAIL, other.to_string())),
    }
}

fn builtin_print(env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    env.context().host.log("info", &line);
    Ok(Value::Null)
}

fn builtin_type(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    match args.first() {
        Some(value) => Ok(Value::str(value.type_name())),
        None => Err(Error::arity("type", "1", 0)),
    }
}

/// Helper for module construction.
pub(crate) fn module_dict(
    entries: Vec<(&'static str, Value)>,
) -> Value {
    let mut map = indexmap::IndexMap::new();
    for (key, value) in entries {
        map.insert(key.to_string(), value);
    }
    Value::dict(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_table_is_cached() {
        let a = module("math").unwrap();
        let b = module("math").unwrap();
        assert_eq!(a, b);
        assert!(module("bogus").is_none());
    }

    #[test]
    fn test_fail_string_form() {
        let env = Environment::root(crate::env::Context::minimal());
        let err = builtin_fail(&env, &[Value::str("boom")]).unwrap_err();
        assert_eq!(err.code, "USER-0001");
        assert_eq!(err.message, "boom");
        assert!(err.class.is_catchable());
    }

    #[test]
    fn test_fail_dict_form_passes_fields_through() {
        let env = Environment::root(crate::env::Context::minimal());
        let mut payload = indexmap::IndexMap::new();
        payload.insert("message".to_string(), Value::str("nope"));
        payload.insert("code".to_string(), Value::str("APP-0042"));
        payload.insert("status".to_string(), Value::Int(409));
        payload.insert("detail".to_string(), Value::str("extra"));
        let err = builtin_fail(&env, &[Value::dict(payload)]).unwrap_err();
        assert_eq!(err.code, "APP-0042");
        assert_eq!(err.status, Some(409));
        assert_eq!(err.fields.len(), 1);
        let dict = err.to_value();
        assert_eq!(dict.get_key("detail"), Some(Value::str("extra")));
    }
}
