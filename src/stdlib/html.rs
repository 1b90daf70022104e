// ABOUTME: std/html — component helpers for building tag trees

use super::module_dict;
use crate::env::Environment;
use crate::error::Error;
use crate::types;
use crate::value::Value;
use std::rc::Rc;

/// Marker for pre-escaped markup that the renderer must not escape again.
pub const TYPE_RAW_HTML: &str = "rawhtml";

pub fn build() -> Value {
    module_dict(vec![
        (
            "classNames",
            Value::builtin("html.classNames", "0+", class_names),
        ),
        ("escape", Value::builtin("html.escape", "1", escape)),
        ("raw", Value::builtin("html.raw", "1", raw)),
        (
            "singletons",
            Value::array(
                crate::config::SINGLETON_ELEMENTS
                    .iter()
                    .map(|name| Value::str(*name))
                    .collect(),
            ),
        ),
    ])
}

/// Compose a class attribute: strings pass through, arrays flatten, and
/// dictionary entries contribute their key when the value is truthy.
fn class_names(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let mut classes: Vec<String> = Vec::new();
    for arg in args {
        collect_classes(arg, &mut classes);
    }
    Ok(Value::str(classes.join(" ")))
}

fn collect_classes(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null | Value::Bool(false) => {}
        Value::Str(s) => {
            for class in s.split_whitespace() {
                if !out.iter().any(|c| c == class) {
                    out.push(class.to_string());
                }
            }
        }
        Value::Array(items) => {
            for item in items.borrow().iter() {
                collect_classes(item, out);
            }
        }
        Value::Dict(map) => {
            for (class, enabled) in map.borrow().iter() {
                if class != crate::config::TYPE_MARKER
                    && enabled.truthy()
                    && !out.iter().any(|c| c == class)
                {
                    out.push(class.clone());
                }
            }
        }
        other => out.push(other.to_string()),
    }
}

fn escape(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let text = args.first().map(|v| v.to_string()).unwrap_or_default();
    Ok(Value::str(crate::render::escape_html(&text)))
}

/// Wrap pre-rendered markup so the renderer emits it verbatim.
fn raw(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let html = args.first().map(|v| v.to_string()).unwrap_or_default();
    Ok(types::typed(TYPE_RAW_HTML, vec![("html", Value::str(html))]))
}
