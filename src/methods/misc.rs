// ABOUTME: Method tables for tags, responses, connections, files, errors,
// and callable values

use super::{want_exact, want_str};
use crate::env::Environment;
use crate::error::{codes, Error};
use crate::eval::call_value;
use crate::types;
use crate::value::Value;
use std::rc::Rc;

pub(super) fn try_invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Option<Result<Value, Error>> {
    match receiver {
        Value::Function(_) | Value::Builtin(_) => {
            if method == "call" {
                return Some(call_value(receiver, args, env));
            }
            return Some(Err(Error::unknown_method("function", method)));
        }
        _ => {}
    }
    match receiver.type_marker().as_deref() {
        Some(types::TYPE_TAG) => Some(dispatch_tag(receiver, method, args)),
        Some(types::TYPE_RESPONSE) => dispatch_response(receiver, method, args),
        Some(types::TYPE_CONNECTION) => Some(dispatch_connection(receiver, method, args, env)),
        Some(types::TYPE_FILE) => dispatch_file(receiver, method, args),
        Some(types::TYPE_ERROR) => None,
        _ => None,
    }
}

fn dispatch_tag(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    match method {
        "render" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(crate::render::render_value(receiver)))
        }
        "name" => {
            want_exact(method, args, 0)?;
            Ok(receiver.get_key("name").unwrap_or(Value::Null))
        }
        "attr" => {
            let key = want_str(method, args, 0)?;
            Ok(receiver
                .get_key("attributes")
                .and_then(|attrs| attrs.get_key(key))
                .unwrap_or(Value::Null))
        }
        _ => Err(Error::unknown_method("tag", method)),
    }
}

fn dispatch_response(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    let result = match method {
        "text" => want_exact(method, args, 0)
            .map(|_| receiver.get_key("body").unwrap_or(Value::Null)),
        "json" => want_exact(method, args, 0).and_then(|_| {
            let body = receiver.get_key("body").unwrap_or(Value::Null).to_string();
            let parsed: serde_json::Value = serde_json::from_str(&body)
                .map_err(|e| Error::format(codes::FMT_JSON, format!("invalid JSON: {e}")))?;
            Ok(Value::from_json(&parsed))
        }),
        "header" => {
            let key = match want_str(method, args, 0) {
                Ok(key) => key.to_lowercase(),
                Err(err) => return Some(Err(err)),
            };
            Ok(receiver
                .get_key("headers")
                .and_then(|headers| headers.get_key(&key))
                .unwrap_or(Value::Null))
        }
        _ => return None,
    };
    Some(result)
}

fn dispatch_connection(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    let context = env.context();
    match method {
        "close" => {
            want_exact(method, args, 0)?;
            if let Some(Value::Int(handle)) = receiver.get_key("handle") {
                context.host.db_close(handle as u64)?;
                receiver.set_key("handle", Value::Null);
            }
            Ok(Value::Null)
        }
        "query" | "queryOne" | "execute" => {
            let sql = want_str(method, args, 0)?;
            let params = args.get(1..).unwrap_or(&[]).to_vec();
            let handle = match receiver.get_key("handle") {
                Some(Value::Int(handle)) => handle as u64,
                _ => {
                    return Err(Error::database(
                        codes::DB_CLOSED,
                        "connection has no open handle",
                    ))
                }
            };
            match method {
                "execute" => {
                    let affected = context.host.db_execute(handle, sql, &params)?;
                    Ok(Value::Int(affected))
                }
                "queryOne" => {
                    let rows = context.host.db_query(handle, sql, &params)?;
                    Ok(rows
                        .into_iter()
                        .next()
                        .map(Value::dict)
                        .unwrap_or(Value::Null))
                }
                _ => {
                    let rows = context.host.db_query(handle, sql, &params)?;
                    Ok(Value::array(rows.into_iter().map(Value::dict).collect()))
                }
            }
        }
        _ => Err(Error::unknown_method("connection", method)),
    }
}

fn dispatch_file(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    let result = match method {
        "text" => want_exact(method, args, 0)
            .map(|_| receiver.get_key("contents").unwrap_or(Value::Null)),
        "size" => want_exact(method, args, 0)
            .map(|_| receiver.get_key("size").unwrap_or(Value::Int(0))),
        _ => return None,
    };
    Some(result)
}
