// ABOUTME: std/id — identifier generators backed by the shared RNG

use super::math::with_rng;
use super::module_dict;
use crate::env::Environment;
use crate::error::Error;
use crate::value::Value;
use rand::Rng;
use std::rc::Rc;

const NANOID_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz-";

pub fn build() -> Value {
    module_dict(vec![
        ("uuid", Value::builtin("id.uuid", "0", uuid)),
        ("nanoid", Value::builtin("id.nanoid", "0-1", nanoid)),
        ("token", Value::builtin("id.token", "0-1", token)),
        ("numeric", Value::builtin("id.numeric", "1", numeric)),
    ])
}

fn length_arg(args: &[Value], default: usize) -> usize {
    args.first()
        .and_then(|v| v.as_int())
        .map(|n| n.clamp(1, 1024) as usize)
        .unwrap_or(default)
}

/// Random (version 4, variant 1) UUID.
fn uuid(_env: &Rc<Environment>, _args: &[Value]) -> Result<Value, Error> {
    let bytes: [u8; 16] = with_rng(|rng| {
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        bytes
    });
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(Value::str(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )))
}

fn nanoid(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let length = length_arg(args, 21);
    let id: String = with_rng(|rng| {
        (0..length)
            .map(|_| NANOID_ALPHABET[rng.gen_range(0..NANOID_ALPHABET.len())] as char)
            .collect()
    });
    Ok(Value::str(id))
}

fn token(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let length = length_arg(args, 32);
    let token: String = with_rng(|rng| {
        (0..length)
            .map(|_| {
                let nibble: u8 = rng.gen_range(0..16);
                char::from_digit(nibble as u32, 16).unwrap_or('0')
            })
            .collect()
    });
    Ok(Value::str(token))
}

fn numeric(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, Error> {
    let length = length_arg(args, 6);
    let digits: String = with_rng(|rng| {
        (0..length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    });
    Ok(Value::str(digits))
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
    fn test_uuid_shape() {
        let Value::Str(id) = uuid(&env(), &[]).unwrap() else {
            panic!("expected string");
        };
        assert_eq!(id.len(), 36);
        assert_eq!(id.as_bytes()[14], b'4');
    }

    #[test]
    #[serial]
    fn test_lengths() {
        let Value::Str(id) = nanoid(&env(), &[]).unwrap() else { panic!() };
        assert_eq!(id.chars().count(), 21);
        let Value::Str(id) = numeric(&env(), &[Value::Int(4)]).unwrap() else {
            panic!()
        };
        assert_eq!(id.len(), 4);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}
