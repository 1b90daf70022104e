// ABOUTME: Array and dictionary method tables

use super::{want_exact, want_int, want_str};
use crate::config::TYPE_MARKER;
use crate::env::Environment;
use crate::error::Error;
use crate::eval::call_value;
use crate::eval::ops::compare;
use crate::value::Value;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::rc::Rc;

pub(super) fn try_invoke_array(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Option<Result<Value, Error>> {
    let items: Vec<Value> = match receiver {
        Value::Array(items) => items.borrow().clone(),
        Value::Range(start, end) => (*start..*end).map(Value::Int).collect(),
        _ => return None,
    };
    Some(dispatch_array(receiver, &items, method, args, env))
}

fn dispatch_array(
    receiver: &Value,
    items: &[Value],
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    match method {
        "length" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(items.len() as i64))
        }
        "push" => {
            if let Value::Array(shared) = receiver {
                for arg in args {
                    shared.borrow_mut().push(arg.clone());
                }
                Ok(receiver.clone())
            } else {
                Err(Error::type_error("push: receiver is not a mutable array"))
            }
        }
        "pop" => {
            want_exact(method, args, 0)?;
            if let Value::Array(shared) = receiver {
                Ok(shared.borrow_mut().pop().unwrap_or(Value::Null))
            } else {
                Err(Error::type_error("pop: receiver is not a mutable array"))
            }
        }
        "shift" => {
            want_exact(method, args, 0)?;
            if let Value::Array(shared) = receiver {
                let mut items = shared.borrow_mut();
                if items.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(items.remove(0))
                }
            } else {
                Err(Error::type_error("shift: receiver is not a mutable array"))
            }
        }
        "unshift" => {
            want_exact(method, args, 1)?;
            if let Value::Array(shared) = receiver {
                shared.borrow_mut().insert(0, args[0].clone());
                Ok(receiver.clone())
            } else {
                Err(Error::type_error("unshift: receiver is not a mutable array"))
            }
        }
        "map" => {
            want_exact(method, args, 1)?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(call_value(&args[0], &[item.clone()], env)?);
            }
            Ok(Value::array(out))
        }
        "filter" => {
            want_exact(method, args, 1)?;
            let mut out = Vec::new();
            for item in items {
                if call_value(&args[0], &[item.clone()], env)?.truthy() {
                    out.push(item.clone());
                }
            }
            Ok(Value::array(out))
        }
        "each" => {
            want_exact(method, args, 1)?;
            for item in items {
                call_value(&args[0], &[item.clone()], env)?;
            }
            Ok(Value::Null)
        }
        "reduce" => {
            want_exact(method, args, 2)?;
            let mut acc = args[1].clone();
            for item in items {
                acc = call_value(&args[0], &[acc, item.clone()], env)?;
            }
            Ok(acc)
        }
        "find" => {
            want_exact(method, args, 1)?;
            for item in items {
                if call_value(&args[0], &[item.clone()], env)?.truthy() {
                    return Ok(item.clone());
                }
            }
            Ok(Value::Null)
        }
        "findIndex" => {
            want_exact(method, args, 1)?;
            for (i, item) in items.iter().enumerate() {
                if call_value(&args[0], &[item.clone()], env)?.truthy() {
                    return Ok(Value::Int(i as i64));
                }
            }
            Ok(Value::Int(-1))
        }
        "contains" => {
            want_exact(method, args, 1)?;
            Ok(Value::Bool(items.contains(&args[0])))
        }
        "join" => {
            let sep = want_str(method, args, 0)?;
            let joined: Vec<String> = items.iter().map(|v| v.to_string()).collect();
            Ok(Value::str(joined.join(sep)))
        }
        "sort" => {
            let mut sorted = items.to_vec();
            if args.is_empty() {
                let mut failed = None;
                sorted.sort_by(|a, b| match compare(a, b) {
                    Ok(ordering) => ordering,
                    Err(err) => {
                        failed.get_or_insert(err);
                        Ordering::Equal
                    }
                });
                if let Some(err) = failed {
                    return Err(err);
                }
            } else {
                want_exact(method, args, 1)?;
                let mut failed = None;
                sorted.sort_by(|a, b| {
                    match call_value(&args[0], &[a.clone(), b.clone()], env) {
                        Ok(Value::Int(n)) => n.cmp(&0),
                        Ok(Value::Float(f)) =>

                            f.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
                        Ok(_) => Ordering::Equal,
                        Err(err) => {
                            failed.get_or_insert(err);
                            Ordering::Equal
                        }
                    }
                });
                if let Some(err) = failed {
                    return Err(err);
                }
            }
            Ok(Value::array(sorted))
        }
        "reverse" => {
            want_exact(method, args, 0)?;
            let mut out = items.to_vec();
            out.reverse();
            Ok(Value::array(out))
        }
        "slice" => {
            let start = want_int(method, args, 0)?;
            let end = want_int(method, args, 1)?;
            let len = items.len() as i64;
            let start = start.clamp(0, len) as usize;
            let end = end.clamp(start as i64, len) as usize;
            Ok(Value::array(items[start..end].to_vec()))
        }
        "concat" => {
            want_exact(method, args, 1)?;
            let mut out = items.to_vec();
            match &args[0] {
                Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                other => out.push(other.clone()),
            }
            Ok(Value::array(out))
        }
        "first" => {
            want_exact(method, args, 0)?;
            Ok(items.first().cloned().unwrap_or(Value::Null))
        }
        "last" => {
            want_exact(method, args, 0)?;
            Ok(items.last().cloned().unwrap_or(Value::Null))
        }
        "unique" => {
            want_exact(method, args, 0)?;
            let mut out: Vec<Value> = Vec::new();
            for item in items {
                if !out.contains(item) {
                    out.push(item.clone());
                }
            }
            Ok(Value::array(out))
        }
        "flatten" => {
            want_exact(method, args, 0)?;
            let mut out = Vec::new();
            for item in items {
                match item {
                    Value::Array(nested) => out.extend(nested.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::array(out))
        }
        "min" => fold_extreme(method, items, args, Ordering::Less),
        "max" => fold_extreme(method, items, args, Ordering::Greater),
        "sum" => {
            want_exact(method, args, 0)?;
            let mut int_sum = 0i64;
            let mut float_sum = 0.0f64;
            let mut saw_float = false;
            for item in items {
                match item {
                    Value::Int(n) => int_sum += n,
                    Value::Float(f) => {
                        saw_float = true;
                        float_sum += f;
                    }
                    other => {
                        return Err(Error::type_error(format!(
                            "sum: expected numbers, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            if saw_float {
                Ok(Value::Float(float_sum + int_sum as f64))
            } else {
                Ok(Value::Int(int_sum))
            }
        }
        "keys" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(
                (0..items.len() as i64).map(Value::Int).collect(),
            ))
        }
        "toJSON" => {
            want_exact(method, args, 0)?;
            let json = Value::array(items.to_vec()).to_json();
            Ok(Value::str(serde_json::to_string(&json).unwrap_or_default()))
        }
        _ => Err(Error::unknown_method("array", method)),
    }
}

fn fold_extreme(
    method: &str,
    items: &[Value],
    args: &[Value],
    keep: Ordering,
) -> Result<Value, Error> {
    want_exact(method, args, 0)?;
    let mut best: Option<Value> = None;
    for item in items {
        match &best {
            None => best = Some(item.clone()),
            Some(current) => {
                if compare(item, current)? == keep {
                    best = Some(item.clone());
                }
            }
        }
    }
    Ok(best.unwrap_or(Value::Null))
}

pub(super) fn try_invoke_dict(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    let Value::Dict(_) = receiver else {
        return None;
    };
    Some(dispatch_dict(receiver, method, args))
}

fn dispatch_dict(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    let Value::Dict(shared) = receiver else {
        unreachable!()
    };
    match method {
        "length" => {
            want_exact(method, args, 0)?;
            let count = shared
                .borrow()
                .keys()
                .filter(|k| k.as_str() != TYPE_MARKER)
                .count();
            Ok(Value::Int(count as i64))
        }
        "keys" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(
                shared
                    .borrow()
                    .keys()
                    .filter(|k| k.as_str() != TYPE_MARKER)
                    .map(Value::str)
                    .collect(),
            ))
        }
        "values" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(
                shared
                    .borrow()
                    .iter()
                    .filter(|(k, _)| k.as_str() != TYPE_MARKER)
                    .map(|(_, v)| v.clone())
                    .collect(),
            ))
        }
        "entries" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(
                shared
                    .borrow()
                    .iter()
                    .filter(|(k, _)| k.as_str() != TYPE_MARKER)
                    .map(|(k, v)| Value::array(vec![Value::str(k), v.clone()]))
                    .collect(),
            ))
        }
        "has" => {
            want_exact(method, args, 1)?;
            let key = args[0].to_string();
            Ok(Value::Bool(shared.borrow().contains_key(&key)))
        }
        "get" => {
            if args.is_empty() || args.len() > 2 {
                return Err(Error::arity(method, "1-2", args.len()));
            }
            let key = args[0].to_string();
            let fallback = args.get(1).cloned().unwrap_or(Value::Null);
            Ok(shared.borrow().get(&key).cloned().unwrap_or(fallback))
        }
        "set" => {
            want_exact(method, args, 2)?;
            shared
                .borrow_mut()
                .insert(args[0].to_string(), args[1].clone());
            Ok(receiver.clone())
        }
        "delete" => {
            want_exact(method, args, 1)?;
            let key = args[0].to_string();
            Ok(shared
                .borrow_mut()
                .shift_remove(&key)
                .unwrap_or(Value::Null))
        }
        "merge" => {
            want_exact(method, args, 1)?;
            let Value::Dict(other) = &args[0] else {
                return Err(Error::type_error(format!(
                    "merge: expected a dictionary, got {}",
                    args[0].type_name()
                )));
            };
            let mut merged: IndexMap<String, Value> = shared.borrow().clone();
            for (key, value) in other.borrow().iter() {
                if key == TYPE_MARKER {
                    continue;
                }
                merged.insert(key.clone(), value.clone());
            }
            Ok(Value::dict(merged))
        }
        "toJSON" => {
            want_exact(method, args, 0)?;
            let json = receiver.to_json();
            Ok(Value::str(serde_json::to_string(&json).unwrap_or_default()))
        }
        _ => Err(Error::unknown_method("dictionary", method)),
    }
}
