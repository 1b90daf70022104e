// ABOUTME: String method table

use super::{want_exact, want_int, want_str};
use crate::error::{codes, Error};
use crate::value::Value;

pub(super) fn try_invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    let Value::Str(s) = receiver else {
        return None;
    };
    Some(dispatch(s, method, args))
}

fn dispatch(s: &str, method: &str, args: &[Value]) -> Result<Value, Error> {
    match method {
        "length" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(s.chars().count() as i64))
        }
        "upper" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(s.to_uppercase()))
        }
        "lower" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(s.to_lowercase()))
        }
        "trim" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(s.trim()))
        }
        "split" => {
            let sep = want_str(method, args, 0)?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::str(c.to_string())).collect()
            } else {
                s.split(sep).map(Value::str).collect()
            };
            Ok(Value::array(parts))
        }
        "contains" => {
            let needle = want_str(method, args, 0)?;
            Ok(Value::Bool(s.contains(needle)))
        }
        "startsWith" => {
            let prefix = want_str(method, args, 0)?;
            Ok(Value::Bool(s.starts_with(prefix)))
        }
        "endsWith" => {
            let suffix = want_str(method, args, 0)?;
            Ok(Value::Bool(s.ends_with(suffix)))
        }
        "replace" => {
            let from = want_str(method, args, 0)?;
            let to = want_str(method, args, 1)?;
            Ok(Value::str(s.replace(from, to)))
        }
        "repeat" => {
            let count = want_int(method, args, 0)?;
            if count < 0 {
                return Err(Error::type_error("repeat: count must not be negative"));
            }
            Ok(Value::str(s.repeat(count as usize)))
        }
        "indexOf" => {
            let needle = want_str(method, args, 0)?;
            match s.find(needle) {
                Some(byte_pos) => Ok(Value::Int(s[..byte_pos].chars().count() as i64)),
                None => Ok(Value::Int(-1)),
            }
        }
        "chars" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(
                s.chars().map(|c| Value::str(c.to_string())).collect(),
            ))
        }
        "lines" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(s.lines().map(Value::str).collect()))
        }
        "words" => {
            want_exact(method, args, 0)?;
            Ok(Value::array(s.split_whitespace().map(Value::str).collect()))
        }
        "padStart" => pad(s, method, args, true),
        "padEnd" => pad(s, method, args, false),
        "slice" => {
            let start = want_int(method, args, 0)?;
            let end = want_int(method, args, 1)?;
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let start = start.clamp(0, len) as usize;
            let end = end.clamp(start as i64, len) as usize;
            Ok(Value::str(chars[start..end].iter().collect::<String>()))
        }
        "reverse" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(s.chars().rev().collect::<String>()))
        }
        "parseInt" => {
            want_exact(method, args, 0)?;
            s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                Error::format(codes::FMT_NUMBER, format!("`{s}` is not an integer"))
            })
        }
        "parseFloat" => {
            want_exact(method, args, 0)?;
            s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                Error::format(codes::FMT_NUMBER, format!("`{s}` is not a number"))
            })
        }
        "parseJSON" => {
            want_exact(method, args, 0)?;
            let parsed: serde_json::Value = serde_json::from_str(s)
                .map_err(|e| Error::format(codes::FMT_JSON, format!("invalid JSON: {e}")))?;
            Ok(Value::from_json(&parsed))
        }
        "toJSON" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(
                serde_json::to_string(&serde_json::Value::String(s.to_string()))
                    .unwrap_or_default(),
            ))
        }
        "capitalize" => {
            want_exact(method, args, 0)?;
            let mut chars = s.chars();
            Ok(Value::str(match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }))
        }
        "kebab" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(case_words(s).join("-")))
        }
        "snake" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(case_words(s).join("_")))
        }
        "camel" => {
            want_exact(method, args, 0)?;
            let words = case_words(s);
            let mut out = String::new();
            for (i, word) in words.iter().enumerate() {
                if i == 0 {
                    out.push_str(word);
                } else {
                    let mut chars = word.chars();
                    if let Some(first) = chars.next() {
                        out.extend(first.to_uppercase());
                        out.push_str(chars.as_str());
                    }
                }
            }
            Ok(Value::str(out))
        }
        _ => Err(Error::unknown_method("string", method)),
    }
}

fn pad(s: &str, method: &str, args: &[Value], at_start: bool) -> Result<Value, Error> {
    let width = want_int(method, args, 0)?.max(0) as usize;
    let fill = want_str(method, args, 1)?;
    let fill = if fill.is_empty() { " " } else { fill };
    let len = s.chars().count();
    if len >= width {
        return Ok(Value::str(s));
    }
    let mut padding = String::new();
    while padding.chars().count() < width - len {
        padding.push_str(fill);
    }
    let padding: String = padding.chars().take(width - len).collect();
    Ok(Value::str(if at_start {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    }))
}

/// Split an identifier-ish string into lowercase words for case conversion.
fn case_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            current.extend(ch.to_lowercase());
        } else {
            prev_lower = false;
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
