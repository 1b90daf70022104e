// ABOUTME: Money values with exact minor-unit arithmetic
// Amounts are stored as i128 minor units (kept as a decimal string in the
// dictionary so 18-scale currencies fit), with the currency code and scale
// alongside. Addition requires identical currency; scalar multiplication and
// division round half-to-even at the currency's scale.

use super::{typed, TYPE_MONEY};
use crate::error::{codes, Error};
use crate::token::MoneyLit;
use crate::value::Value;

/// Currency metadata: (code, symbol rendering, scale).
const CURRENCIES: &[(&str, &str, u8)] = &[
    ("USD", "$", 2),
    ("GBP", "£", 2),
    ("EUR", "€", 2),
    ("JPY", "¥", 0),
    ("CAD", "CA$", 2),
    ("AUD", "AU$", 2),
    ("HKD", "HK$", 2),
    ("SGD", "S$", 2),
    ("NZD", "NZ$", 2),
    ("CNY", "CN¥", 2),
    ("KRW", "KRW#", 0),
    ("VND", "VND#", 0),
    ("BTC", "BTC#", 8),
    ("ETH", "ETH#", 18),
];

pub fn currency_scale(code: &str) -> u8 {
    CURRENCIES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, scale)| *scale)
        .unwrap_or(2)
}

pub fn currency_symbol(code: &str) -> Option<&'static str> {
    CURRENCIES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, symbol, _)| *symbol)
}

pub fn money_value(minor: i128, currency: &str, scale: u8) -> Value {
    typed(
        TYPE_MONEY,
        vec![
            ("minor", Value::str(minor.to_string())),
            ("currency", Value::str(currency)),
            ("scale", Value::Int(scale as i64)),
        ],
    )
}

pub fn from_literal(lit: &MoneyLit) -> Value {
    money_value(lit.minor, &lit.currency, lit.scale)
}

pub fn parts(value: &Value) -> Option<(i128, String, u8)> {
    let minor = value.get_key("minor")?.as_str()?.parse::<i128>().ok()?;
    let currency = value.get_key("currency")?.as_str()?.to_string();
    let scale = value.get_key("scale")?.as_int()? as u8;
    Some((minor, currency, scale))
}

fn malformed() -> Error {
    Error::format(codes::FMT_NUMBER, "malformed money value")
}

pub fn add(left: &Value, right: &Value, subtract: bool) -> Result<Value, Error> {
    let (l_minor, l_currency, l_scale) = parts(left).ok_or_else(malformed)?;
    let (r_minor, r_currency, _) = parts(right).ok_or_else(malformed)?;
    if l_currency != r_currency {
        return Err(Error::operator(
            codes::OP_CURRENCY_MISMATCH,
            format!("cannot mix {l_currency} and {r_currency}"),
        ));
    }
    let minor = if subtract {
        l_minor - r_minor
    } else {
        l_minor + r_minor
    };
    Ok(money_value(minor, &l_currency, l_scale))
}

/// Multiply by a scalar, rounding half-to-even at the currency scale.
pub fn scale_by(value: &Value, factor: f64) -> Result<Value, Error> {
    let (minor, currency, scale) = parts(value).ok_or_else(malformed)?;
    let scaled = bankers_round(minor as f64 * factor);
    Ok(money_value(scaled, &currency, scale))
}

pub fn divide(value: &Value, divisor: f64) -> Result<Value, Error> {
    if divisor == 0.0 {
        return Err(Error::operator(codes::OP_DIVISION_BY_ZERO, "division by zero"));
    }
    scale_by(value, 1.0 / divisor)
}

pub fn negate(value: &Value) -> Result<Value, Error> {
    let (minor, currency, scale) = parts(value).ok_or_else(malformed)?;
    Ok(money_value(-minor, &currency, scale))
}

fn bankers_round(x: f64) -> i128 {
    let floor = x.floor();
    let fraction = x - floor;
    if (fraction - 0.5).abs() < f64::EPSILON {
        let floor = floor as i128;
        if floor % 2 == 0 {
            floor
        } else {
            floor + 1
        }
    } else {
        x.round() as i128
    }
}

pub fn format_money(value: &Value) -> String {
    let Some((minor, currency, scale)) = parts(value) else {
        return "<money>".to_string();
    };
    let symbol = currency_symbol(&currency)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{currency}#"));
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.abs();
    if scale == 0 {
        return format!("{sign}{symbol}{minor}");
    }
    let divisor = 10_i128.pow(scale as u32);
    let whole = minor / divisor;
    let fraction = minor % divisor;
    format!(
        "{sign}{symbol}{whole}.{fraction:0>width$}",
        width = scale as usize
    )
}
