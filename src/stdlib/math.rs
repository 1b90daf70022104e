// ABOUTME: std/math — numeric helpers and the seedable process RNG

use super::module_dict;
use crate::env::Environment;
use crate::error::{codes, Error};
use crate::value::Value;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static RNG: RefCell<rand::rngs::StdRng> =
        RefCell::new(rand::rngs::StdRng::from_entropy());
}

pub fn build() -> Value {
    module_dict(vec![
        ("pi", Value::Float(std::f64::consts::PI)),
        ("e", Value::Float(std::f64::consts::E)),
        ("abs", Value::builtin("math.abs", "1", abs)),
        ("floor", Value::builtin("math.floor", "1", floor)),
        ("ceil", Value::builtin("math.ceil", "1", ceil)),
        ("round", Value::builtin("math.round", "1", round)),
        ("sqrt", Value::builtin("math.sqrt", "1", sqrt)),
        ("pow", Value::builtin("math.pow", "2", pow)),
        ("min", Value::builtin("math.min", "1+", min)),
        ("max", Value::builtin("math.max", "1+", max)),
        ("clamp", Value::builtin("math.clamp", "3", clamp)),
        ("sum", Value::builtin("math.sum", "1", sum)),
        ("mean", Value::builtin("math.mean", "1", mean)),
        ("random", Value::builtin("math.random", "0", random)),
        ("randomInt", Value::builtin("math.randomInt", "2", random_int)),
        ("seed", Value::builtin("math.seed", "1", seed)),
    ])
}

fn number(name: &str, args: &[Value], i: usize) -> Result<f64, Error> {
    args.get(i).and_then(|v| v.as_f64()).ok_or_else(|| {
        Error::type_error(format!("{name}: expected a number at argument {}", i + 1))
    })
}

fn numbers_of(name: &str, value: &Value) -> Result<Vec<f64>, Error> {
    match value {
        Value::Array(items) => items
            .borrow()
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| {
                    Error::type_error(format!("{name}: expected an array of numbers"))
                })
            })
            .collect(),
        other => Err(Error::type_error(format!(
            "{name}: expected an array, got {}",
            other.type_name()
        ))),
    }
}

fn abs(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    match args.first() {
        Some(Value::Int(n)) => Ok(Value::Int(n.abs())),
        _ => Ok(Value::Float(number("math.abs", args, 0)?.abs())),
    }
}

fn floor(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int(number("math.floor", args, 0)?.floor() as i64))
}

fn ceil(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int(number("math.ceil", args, 0)?.ceil() as i64))
}

fn round(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Int(number("math.round", args, 0)?.round() as i64))
}

fn sqrt(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let n = number("math.sqrt", args, 0)?;
    if n < 0.0 {
        return Err(Error::value_error(
            codes::USER_FAIL,
            "math.sqrt: negative argument",
        ));
    }
    Ok(Value::Float(n.sqrt()))
}

fn pow(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let base = number("math.pow", args, 0)?;
    let exponent = number("math.pow", args, 1)?;
    Ok(Value::Float(base.powf(exponent)))
}

fn min(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let values = collect_variadic("math.min", args)?;
    Ok(values
        .into_iter()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(Value::Float)
        .unwrap_or(Value::Null))
}

fn max(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let values = collect_variadic("math.max", args)?;
    Ok(values
        .into_iter()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(Value::Float)
        .unwrap_or(Value::Null))
}

fn collect_variadic(name: &str, args: &[Value]) -> Result<Vec<f64>, Error> {
    if args.len() == 1 && matches!(args[0], Value::Array(_)) {
        return numbers_of(name, &args[0]);
    }
    args.iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| Error::type_error(format!("{name}: expected numbers")))
        })
        .collect()
}

fn clamp(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let n = number("math.clamp", args, 0)?;
    let lo = number("math.clamp", args, 1)?;
    let hi = number("math.clamp", args, 2)?;
    Ok(Value::Float(n.clamp(lo, hi)))
}

fn sum(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let values = numbers_of("math.sum", args.first().unwrap_or(&Value::Null))?;
    Ok(Value::Float(values.iter().sum()))
}

fn mean(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let values = numbers_of("math.mean", args.first().unwrap_or(&Value::Null))?;
    if values.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Float(values.iter().sum::<f64>() / values.len() as f64))
}

fn random(_env: &Rc<Environment>, _args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float(RNG.with(|rng| rng.borrow_mut().gen::<f64>())))
}

fn random_int(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let lo = number("math.randomInt", args, 0)? as i64;
    let hi = number("math.randomInt", args, 1)? as i64;
    if lo > hi {
        return Err(Error::type_error("math.randomInt: empty range"));
    }
    Ok(Value::Int(
        RNG.with(|rng| rng.borrow_mut().gen_range(lo..=hi)),
    ))
}

/// Reseed the process-wide generator; callers that require reproducible
/// sequences call this first.
fn seed(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let n = number("math.seed", args, 0)? as u64;
    RNG.with(|rng| *rng.borrow_mut() = rand::rngs::StdRng::seed_from_u64(n));
    Ok(Value::Null)
}

/// Shared with `std/id`: all engine randomness draws from one generator.
pub(crate) fn with_rng<T>(f: impl FnOnce(&mut rand::rngs::StdRng) -> T) -> T {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Context;
    use serial_test::serial;

    fn env() -> Rc<Environment> {
        Environment::root(Context::minimal())
    }

    #[test]
    #[serial]
    fn test_seeded_random_is_reproducible() {
        let env = env();
        seed(&env, &[Value::Int(42)]).unwrap();
        let first = random_int(&env, &[Value::Int(0), Value::Int(1_000_000)]).unwrap();
        seed(&env, &[Value::Int(42)]).unwrap();
        let second = random_int(&env, &[Value::Int(0), Value::Int(1_000_000)]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregates() {
        let env = env();
        let xs = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(sum(&env, &[xs.clone()]).unwrap(), Value::Float(6.0));
        assert_eq!(mean(&env, &[xs]).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_clamp() {
        let env = env();
        assert_eq!(
            clamp(&env, &[Value::Int(15), Value::Int(0), Value::Int(10)]).unwrap(),
            Value::Float(10.0)
        );
    }
}
