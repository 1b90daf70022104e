// ABOUTME: std/schema — schema construction and the field rule builders
// A field rule is a typed dictionary tagged `rule`; the builders produce the
// base rules and the rule method table (`required`, `min`, ...) refines them.

use super::module_dict;
use crate::env::Environment;
use crate::error::Error;
use crate::types::{self, schema as schema_types};
use crate::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;

pub const TYPE_RULE: &str = "rule";

fn base_rule(kind: &str) -> Value {
    types::typed(TYPE_RULE, vec![("type", Value::str(kind))])
}

/// The builder values visible inside `@schema` bodies.
pub fn builder_bindings() -> Value {
    module_dict(vec![
        ("string", base_rule("string")),
        ("int", base_rule("int")),
        ("float", base_rule("float")),
        ("bool", base_rule("bool")),
        ("date", base_rule("date")),
        ("money", base_rule("money")),
        ("ref", base_rule("ref")),
    ])
}

pub fn build() -> Value {
    let builders = builder_bindings();
    let mut entries = vec![(
        "schema",
        Value::builtin("schema.schema", "2", make_schema),
    )];
    let mut map = IndexMap::new();
    if let Value::Dict(builder_map) = &builders {
        for (key, value) in builder_map.borrow().iter() {
            map.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in entries.drain(..) {
        map.insert(key.to_string(), value);
    }
    Value::dict(map)
}

/// `schema(name, {field: rule, ...})` — the builtin behind `@schema`.
fn make_schema(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let name = match args.first() {
        Some(Value::Str(name)) => name.clone(),
        _ => return Err(Error::type_error("schema: expected a name string")),
    };
    let fields = match args.get(1) {
        Some(Value::Dict(fields)) => fields.borrow().clone(),
        _ => return Err(Error::type_error("schema: expected a field dictionary")),
    };
    Ok(schema_types::define_schema(&name, fields))
}

/// Rule refinement methods, dispatched from the central method table.
pub fn rule_method(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Result<Value, Error> {
    let refined = |key: &str, value: Value| -> Result<Value, Error> {
        let Value::Dict(map) = receiver else {
            return Err(Error::type_error("rule receiver must be a dictionary"));
        };
        let mut out = map.borrow().clone();
        out.insert(key.to_string(), value);
        Ok(Value::dict(out))
    };
    match method {
        "required" => refined("required", Value::Bool(true)),
        "unique" => refined("unique", Value::Bool(true)),
        "default" => refined(
            "default",
            args.first().cloned().unwrap_or(Value::Null),
        ),
        "min" => refined("min", args.first().cloned().unwrap_or(Value::Int(0))),
        "max" => refined("max", args.first().cloned().unwrap_or(Value::Int(0))),
        "matches" => {
            let pattern = match args.first() {
                Some(Value::Str(p)) => Value::str(p),
                Some(other) if types::is_typed(other, types::TYPE_REGEX) => {
                    other.get_key("pattern").unwrap_or(Value::Null)
                }
                _ => return Err(Error::type_error("matches: expected a pattern")),
            };
            refined("matches", pattern)
        }
        "oneOf" => refined("oneOf", args.first().cloned().unwrap_or(Value::Null)),
        // `via` links the field to another table by name; resolution is
        // lazy to keep schema/table references acyclic.
        "via" => refined("via", args.first().cloned().unwrap_or(Value::Null)),
        _ => Err(Error::unknown_method("rule", method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_chain_refines_immutably() {
        let base = base_rule("string");
        let required = rule_method(&base, "required", &[]).unwrap();
        let bounded = rule_method(&required, "min", &[Value::Int(3)]).unwrap();
        assert_eq!(bounded.get_key("required"), Some(Value::Bool(true)));
        assert_eq!(bounded.get_key("min"), Some(Value::Int(3)));
        // The base rule is untouched.
        assert_eq!(base.get_key("required"), None);
    }

    #[test]
    fn test_schema_builtin_builds_records() {
        let env = Environment::root(crate::env::Context::minimal());
        let mut fields = IndexMap::new();
        fields.insert(
            "title".to_string(),
            rule_method(&base_rule("string"), "required", &[]).unwrap(),
        );
        let schema = make_schema(
            &env,
            &[Value::str("Post"), Value::dict(fields)],
        )
        .unwrap();
        assert!(types::is_typed(&schema, types::TYPE_SCHEMA));
    }
}
