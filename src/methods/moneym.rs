// ABOUTME: Money method table — amount access, formatting, exact splitting

use super::{want_exact, want_int};
use crate::error::{codes, Error};
use crate::types::money;
use crate::value::Value;

pub(super) fn try_invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    Some(dispatch(receiver, method, args))
}

fn dispatch(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    let (minor, currency, scale) = money::parts(receiver)
        .ok_or_else(|| Error::format(codes::FMT_NUMBER, "malformed money value"))?;
    match method {
        "amount" => {
            want_exact(method, args, 0)?;
            let divisor = 10f64.powi(scale as i32);
            Ok(Value::Float(minor as f64 / divisor))
        }
        "minor" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(minor as i64))
        }
        "currency" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(currency))
        }
        "format" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(money::format_money(receiver)))
        }
        // Split into n parts differing by at most one minor unit; the
        // leading parts absorb the remainder so the sum is exact.
        "split" => {
            let n = want_int(method, args, 0)?;
            if n <= 0 {
                return Err(Error::type_error("split: count must be positive"));
            }
            let n = n as i128;
            let base = minor / n;
            let remainder = (minor % n).abs();
            let sign = if minor < 0 { -1 } else { 1 };
            let mut out = Vec::new();
            for i in 0..n {
                let extra = if i < remainder { sign } else { 0 };
                out.push(money::money_value(base + extra, &currency, scale));
            }
            Ok(Value::array(out))
        }
        // Allocate across integer ratios, largest-remainder style.
        "allocate" => {
            want_exact(method, args, 1)?;
            let Value::Array(ratios) = &args[0] else {
                return Err(Error::type_error("allocate: expected an array of ratios"));
            };
            let ratios: Vec<i128> = ratios
                .borrow()
                .iter()
                .map(|r| r.as_int().map(|n| n as i128))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| Error::type_error("allocate: ratios must be integers"))?;
            let total: i128 = ratios.iter().sum();
            if total <= 0 {
                return Err(Error::type_error("allocate: ratios must sum above zero"));
            }
            let mut out = Vec::new();
            let mut allocated: i128 = 0;
            for (i, ratio) in ratios.iter().enumerate() {
                let share = if i == ratios.len() - 1 {
                    minor - allocated
                } else {
                    minor * ratio / total
                };
                allocated += share;
                out.push(money::money_value(share, &currency, scale));
            }
            Ok(Value::array(out))
        }
        _ => Err(Error::unknown_method("money", method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_and_currency() {
        let m = money::money_value(1525, "USD", 2);
        assert_eq!(dispatch(&m, "amount", &[]).unwrap(), Value::Float(15.25));
        assert_eq!(dispatch(&m, "currency", &[]).unwrap(), Value::str("USD"));
    }

    #[test]
    fn test_split_is_exact() {
        let m = money::money_value(1000, "USD", 2);
        let Value::Array(parts) = dispatch(&m, "split", &[Value::Int(3)]).unwrap() else {
            panic!("expected array");
        };
        let parts = parts.borrow();
        let strings: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
        assert_eq!(strings, vec!["$3.34", "$3.33", "$3.33"]);
    }

    #[test]
    fn test_allocate_sums_exactly() {
        let m = money::money_value(1001, "USD", 2);
        let ratios = Value::array(vec![Value::Int(1), Value::Int(1), Value::Int(1)]);
        let Value::Array(parts) = dispatch(&m, "allocate", &[ratios]).unwrap() else {
            panic!("expected array");
        };
        let total: i128 = parts
            .borrow()
            .iter()
            .map(|p| money::parts(p).unwrap().0)
            .sum();
        assert_eq!(total, 1001);
    }
}
