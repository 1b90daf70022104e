// ABOUTME: std/dev — development logging through the host's log callback

use super::module_dict;
use crate::env::Environment;
use crate::error::Error;
use crate::eval::call_value;
use crate::value::Value;
use std::rc::Rc;

pub fn build() -> Value {
    module_dict(vec![
        ("log", Value::builtin("dev.log", "0+", log_info)),
        ("debug", Value::builtin("dev.debug", "0+", log_debug)),
        ("warn", Value::builtin("dev.warn", "0+", log_warn)),
        ("error", Value::builtin("dev.error", "0+", log_error)),
        ("inspect", Value::builtin("dev.inspect", "1", inspect)),
        ("time", Value::builtin("dev.time", "1", time)),
    ])
}

fn emit(env: &Rc<Environment>, level: &str, args: &[Value]) -> Result<Value, Error> {
    let line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    env.context().host.log(level, &line);
    Ok(Value::Null)
}

fn log_info(env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    emit(env, "info", args)
}

fn log_debug(env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    emit(env, "debug", args)
}

fn log_warn(env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    emit(env, "warn", args)
}

fn log_error(env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    emit(env, "error", args)
}

/// Log the developer rendering of a value and return the value unchanged,
/// so `inspect` can wrap any expression in place.
fn inspect(env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let value = args.first().cloned().unwrap_or(Value::Null);
    env.context().host.log("debug", &value.inspect());
    Ok(value)
}

/// Run a function and report the wall-clock duration alongside its result.
fn time(env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let callable = args
        .first()
        .ok_or_else(|| Error::arity("dev.time", "1", 0))?;
    let started = std::time::Instant::now();
    let result = call_value(callable, &[], env)?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let mut out = indexmap::IndexMap::new();
    out.insert("result".to_string(), result);
    out.insert("ms".to_string(), Value::Float(elapsed_ms));
    Ok(Value::dict(out))
}
