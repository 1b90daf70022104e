// ABOUTME: Per-type method tables and the single dispatch point
// `invoke` consults the receiver's type tag and routes to a fixed table;
// typed dictionaries fall back to the generic dictionary methods so `keys()`
// and friends stay available on records and the like.

mod collections;
mod misc;
mod moneym;
mod numbers;
mod pathurl;
mod records;
mod regexes;
mod strings;
mod temporal;

use crate::env::Environment;
use crate::error::Error;
use crate::types;
use crate::value::Value;
use std::rc::Rc;

pub fn invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    let table_hit = match receiver.type_marker().as_deref() {
        Some(types::TYPE_DATE) | Some(types::TYPE_TIME) | Some(types::TYPE_DATETIME)
        | Some(types::TYPE_DURATION) => temporal::try_invoke(receiver, method, args),
        Some(types::TYPE_MONEY) => moneym::try_invoke(receiver, method, args),
        Some(types::TYPE_PATH) | Some(types::TYPE_URL) => {
            pathurl::try_invoke(receiver, method, args, env)
        }
        Some(types::TYPE_REGEX) => regexes::try_invoke(receiver, method, args, env),
        Some(types::TYPE_SCHEMA) | Some(types::TYPE_RECORD) | Some(types::TYPE_TABLE) => {
            records::try_invoke(receiver, method, args, env)
        }
        Some(types::TYPE_TAG)
        | Some(types::TYPE_RESPONSE)
        | Some(types::TYPE_CONNECTION)
        | Some(types::TYPE_FILE)
        | Some(types::TYPE_ERROR) => misc::try_invoke(receiver, method, args, env),
        Some(crate::stdlib::schema::TYPE_RULE) => {
            Some(crate::stdlib::schema::rule_method(receiver, method, args))
        }
        _ => None,
    };
    if let Some(result) = table_hit {
        return result;
    }

    let generic = match receiver {
        Value::Str(_) => strings::try_invoke(receiver, method, args),
        Value::Array(_) | Value::Range(_, _) => {
            collections::try_invoke_array(receiver, method, args, env)
        }
        Value::Dict(_) => collections::try_invoke_dict(receiver, method, args),
        Value::Int(_) | Value::Float(_) => numbers::try_invoke(receiver, method, args),
        Value::Function(_) | Value::Builtin(_) => misc::try_invoke(receiver, method, args, env),
        _ => None,
    };
    if let Some(result) = generic {
        return result;
    }

    Err(Error::unknown_method(&receiver.type_name(), method))
}

// ============================================================================
// Argument helpers shared by the tables
// ============================================================================

pub(crate) fn want_exact(method: &str, args: &[Value], n: usize) -> Result<(), Error> {
    if args.len() != n {
        return Err(Error::arity(method, &n.to_string(), args.len()));
    }
    Ok(())
}

pub(crate) fn want_str<'a>(method: &str, args: &'a [Value], i: usize) -> Result<&'a str, Error> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(Error::type_error(format!(
            "{method}: argument {} must be a string, got {}",
            i + 1,
            other.type_name()
        ))),
        None => Err(Error::arity(method, "more", args.len())),
    }
}

pub(crate) fn want_int(method: &str, args: &[Value], i: usize) -> Result<i64, Error> {
    match args.get(i) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(Error::type_error(format!(
            "{method}: argument {} must be an integer, got {}",
            i + 1,
            other.type_name()
        ))),
        None => Err(Error::arity(method, "more", args.len())),
    }
}
