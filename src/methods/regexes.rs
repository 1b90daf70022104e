// ABOUTME: Regex method table — match, matchAll, test, replace
// Replacement accepts a string (with $1-style group references) or a
// function receiving the full match and capture groups.

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
    Some(dispatch(receiver, method, args, env))
}

fn compiled(receiver: &Value) -> Result<regex::Regex, Error> {
    types::compile_regex(receiver)
        .ok_or_else(|| Error::format(codes::FMT_NUMBER, "regex failed to compile"))
}

fn global(receiver: &Value) -> bool {
    receiver
        .get_key("flags")
        .and_then(|f| f.as_str().map(|s| s.contains('g')))
        .unwrap_or(false)
}

fn dispatch(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Rc<Environment>,
) -> Result<Value, Error> {
    match method {
        "test" => {
            let text = want_str(method, args, 0)?;
            Ok(Value::Bool(compiled(receiver)?.is_match(text)))
        }
        "match" => {
            let text = want_str(method, args, 0)?;
            let re = compiled(receiver)?;
            match re.captures(text) {
                None => Ok(Value::Null),
                Some(caps) => Ok(captures_to_array(&caps)),
            }
        }
        "matchAll" => {
            let text = want_str(method, args, 0)?;
            let re = compiled(receiver)?;
            Ok(Value::array(
                re.captures_iter(text)
                    .map(|caps| captures_to_array(&caps))
                    .collect(),
            ))
        }
        "replace" => {
            want_exact(method, args, 2)?;
            let text = want_str(method, args, 0)?;
            let re = compiled(receiver)?;
            let all = global(receiver);
            match &args[1] {
                Value::Str(replacement) => {
                    let replaced = if all {
                        re.replace_all(text, replacement.as_str())
                    } else {
                        re.replace(text, replacement.as_str())
                    };
                    Ok(Value::str(replaced.to_string()))
                }
                callable @ (Value::Function(_) | Value::Builtin(_)) => {
                    let mut failed: Option<Error> = None;
                    let apply = |caps: &regex::Captures| -> String {
                        let call_args: Vec<Value> = caps
                            .iter()
                            .map(|group| match group {
                                Some(m) => Value::str(m.as_str()),
                                None => Value::Null,
                            })
                            .collect();
                        match call_value(callable, &call_args, env) {
                            Ok(value) => value.to_string(),
                            Err(err) => {
                                failed.get_or_insert(err);
                                String::new()
                            }
                        }
                    };
                    let replaced = if all {
                        re.replace_all(text, apply).to_string()
                    } else {
                        re.replace(text, apply).to_string()
                    };
                    match failed {
                        Some(err) => Err(err),
                        None => Ok(Value::str(replaced)),
                    }
                }
                other => Err(Error::type_error(format!(
                    "replace: expected a string or function, got {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(Error::unknown_method("regex", method)),
    }
}

fn captures_to_array(caps: &regex::Captures) -> Value {
    Value::array(
        caps.iter()
            .map(|group| match group {
                Some(m) => Value::str(m.as_str()),
                None => Value::Null,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Context, Environment};

    fn env() -> Rc<Environment> {
        Environment::root(Context::minimal())
    }

    #[test]
    fn test_match_and_test() {
        let re = types::regex_value(r"(\d+)-(\d+)", "");
        let result = dispatch(&re, "match", &[Value::str("10-20")], &env()).unwrap();
        let Value::Array(items) = &result else { panic!() };
        assert_eq!(items.borrow()[1], Value::str("10"));
        assert_eq!(
            dispatch(&re, "test", &[Value::str("xx")], &env()).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_string_replacement_honours_g_flag() {
        let once = types::regex_value("a", "");
        assert_eq!(
            dispatch(&once, "replace", &[Value::str("aaa"), Value::str("b")], &env()).unwrap(),
            Value::str("baa")
        );
        let all = types::regex_value("a", "g");
        assert_eq!(
            dispatch(&all, "replace", &[Value::str("aaa"), Value::str("b")], &env()).unwrap(),
            Value::str("bbb")
        );
    }

    #[test]
    fn test_match_all() {
        let re = types::regex_value(r"\d+", "g");
        let result = dispatch(&re, "matchAll", &[Value::str("1 and 22")], &env()).unwrap();
        let Value::Array(items) = &result else { panic!() };
        assert_eq!(items.borrow().len(), 2);
    }
}
