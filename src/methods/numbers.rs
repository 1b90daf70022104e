// ABOUTME: Integer and float method table

use super::{want_exact, want_int};
use crate::error::Error;
use crate::value::Value;

pub(super) fn try_invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    let n = receiver.as_f64()?;
    Some(dispatch(receiver, n, method, args))
}

fn dispatch(receiver: &Value, n: f64, method: &str, args: &[Value]) -> Result<Value, Error> {
    match method {
        "abs" => {
            want_exact(method, args, 0)?;
            match receiver {
                Value::Int(i) => Ok(Value::Int(i.abs())),
                _ => Ok(Value::Float(n.abs())),
            }
        }
        "floor" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(n.floor() as i64))
        }
        "ceil" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(n.ceil() as i64))
        }
        "round" => {
            if args.is_empty() {
                return Ok(Value::Int(n.round() as i64));
            }
            let digits = want_int(method, args, 0)?.clamp(0, 12) as u32;
            let factor = 10f64.powi(digits as i32);
            Ok(Value::Float((n * factor).round() / factor))
        }
        "toFixed" => {
            let digits = want_int(method, args, 0)?.clamp(0, 12) as usize;
            Ok(Value::str(format!("{n:.digits$}")))
        }
        "toString" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(receiver.to_string()))
        }
        _ => Err(Error::unknown_method(&receiver.type_name(), method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(
            dispatch(&Value::Float(2.5), 2.5, "round", &[]).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            dispatch(&Value::Float(2.345), 2.345, "round", &[Value::Int(2)]).unwrap(),
            Value::Float(2.35)
        );
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(
            dispatch(&Value::Float(1.5), 1.5, "toFixed", &[Value::Int(2)]).unwrap(),
            Value::str("1.50")
        );
    }

    #[test]
    fn test_abs_keeps_int() {
        assert_eq!(
            dispatch(&Value::Int(-4), -4.0, "abs", &[]).unwrap(),
            Value::Int(4)
        );
    }
}
