// ABOUTME: std/valid — standalone validators returning booleans

use super::module_dict;
use crate::env::Environment;
use crate::error::Error;
use crate::value::Value;
use std::rc::Rc;

pub fn build() -> Value {
    module_dict(vec![
        ("email", Value::builtin("valid.email", "1", email)),
        ("url", Value::builtin("valid.url", "1", url)),
        ("uuid", Value::builtin("valid.uuid", "1", uuid)),
        ("slug", Value::builtin("valid.slug", "1", slug)),
        ("integer", Value::builtin("valid.integer", "1", integer)),
        ("number", Value::builtin("valid.number", "1", number)),
        ("matches", Value::builtin("valid.matches", "2", matches_fn)),
        ("minLength", Value::builtin("valid.minLength", "2", min_length)),
        ("maxLength", Value::builtin("valid.maxLength", "2", max_length)),
        ("between", Value::builtin("valid.between", "3", between)),
        ("required", Value::builtin("valid.required", "1", required)),
        ("oneOf", Value::builtin("valid.oneOf", "2", one_of)),
    ])
}

fn text(args: &[Value]) -> Option<&str> {
    match args.first() {
        Some(Value::Str(s)) => Some(s),
        _ => None,
    }
}

fn check_pattern(args: &[Value], pattern: &str) -> Result<Value, Error> {
    let Some(s) = text(args) else {
        return Ok(Value::Bool(false));
    };
    let re = regex::Regex::new(pattern)
        .map_err(|e| Error::type_error(format!("validator pattern failed: {e}")))?;
    Ok(Value::Bool(re.is_match(s)))
}

fn email(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    check_pattern(args, r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
}

fn url(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    check_pattern(args, r"^(https?|ftp|wss?)://[^\s/$.?#].[^\s]*$")
}

fn uuid(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    check_pattern(
        args,
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
}

fn slug(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    check_pattern(args, r"^[a-z0-9]+(-[a-z0-9]+)*$")
}

fn integer(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    match args.first() {
        Some(Value::Int(_)) => Ok(Value::Bool(true)),
        Some(Value::Str(s)) => Ok(Value::Bool(s.trim().parse::<i64>().is_ok())),
        _ => Ok(Value::Bool(false)),
    }
}

fn number(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    match args.first() {
        Some(Value::Int(_)) | Some(Value::Float(_)) => Ok(Value::Bool(true)),
        Some(Value::Str(s)) => Ok(Value::Bool(s.trim().parse::<f64>().is_ok())),
        _ => Ok(Value::Bool(false)),
    }
}

fn matches_fn(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let Some(s) = text(args) else {
        return Ok(Value::Bool(false));
    };
    let pattern = match args.get(1) {
        Some(Value::Str(p)) => p.clone(),
        Some(other) if other.type_marker().as_deref() == Some("regex") => other
            .get_key("pattern")
            .map(|p| p.to_string())
            .unwrap_or_default(),
        _ => return Err(Error::type_error("valid.matches: expected a pattern")),
    };
    let re = regex::Regex::new(&pattern)
        .map_err(|e| Error::type_error(format!("valid.matches: bad pattern: {e}")))?;
    Ok(Value::Bool(re.is_match(s)))
}

fn min_length(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let min = args.get(1).and_then(|v| v.as_int()).unwrap_or(0);
    Ok(Value::Bool(length_of(args.first()) >= min))
}

fn max_length(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let max = args.get(1).and_then(|v| v.as_int()).unwrap_or(i64::MAX);
    Ok(Value::Bool(length_of(args.first()) <= max))
}

fn length_of(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Str(s)) => s.chars().count() as i64,
        Some(Value::Array(items)) => items.borrow().len() as i64,
        _ => 0,
    }
}

fn between(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let (Some(n), Some(lo), Some(hi)) = (
        args.first().and_then(|v| v.as_f64()),
        args.get(1).and_then(|v| v.as_f64()),
        args.get(2).and_then(|v| v.as_f64()),
    ) else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(n >= lo && n <= hi))
}

fn required(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(
        args.first().map(|v| v.truthy()).unwrap_or(false),
    ))
}

fn one_of(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let (Some(value), Some(Value::Array(options))) = (args.first(), args.get(1)) else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(options.borrow().contains(value)))
}
