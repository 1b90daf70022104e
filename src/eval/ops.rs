// ABOUTME: Operator semantics — arithmetic coercion, set operations,
// natural-order comparison, regex matching, and membership tests
// All of these are pure; the lazy operators (and/or/??) short-circuit in the
// tree walker before both operands exist.

use crate::ast::{InfixOp, PrefixOp};
use crate::error::{codes, Error};
use crate::types::{self, datetime, money};
use crate::value::Value;
use std::cmp::Ordering;

pub fn eval_prefix(op: &PrefixOp, value: Value) -> Result<Value, Error> {
    match op {
        PrefixOp::Not => Ok(Value::Bool(!value.truthy())),
        PrefixOp::Neg => match &value {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ if types::is_typed(&value, types::TYPE_MONEY) => money::negate(&value),
            _ if types::is_typed(&value, types::TYPE_DURATION) => {
                let (months, seconds) = datetime::duration_parts(&value).unwrap_or((0, 0));
                Ok(datetime::duration_value(-months, -seconds))
            }
            other => Err(Error::type_error(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
    }
}

/// Strict (non-short-circuiting) infix operators.
pub fn eval_infix(op: &InfixOp, left: Value, right: Value) -> Result<Value, Error> {
    match op {
        InfixOp::Add => add(left, right),
        InfixOp::Sub => sub(left, right),
        InfixOp::Mul => mul(left, right),
        InfixOp::Div => div(left, right),
        InfixOp::Mod => modulo(left, right),
        InfixOp::Concat => concat(left, right),
        InfixOp::Range => range(left, right),
        InfixOp::Eq => Ok(Value::Bool(left == right)),
        InfixOp::NotEq => Ok(Value::Bool(left != right)),
        InfixOp::Lt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Less)),
        InfixOp::Gt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Greater)),
        InfixOp::Le => Ok(Value::Bool(compare(&left, &right)? != Ordering::Greater)),
        InfixOp::Ge => Ok(Value::Bool(compare(&left, &right)? != Ordering::Less)),
        InfixOp::Match => regex_match(left, right),
        InfixOp::NotMatch => {
            let matched = regex_match(left, right)?;
            Ok(Value::Bool(matched.is_null()))
        }
        InfixOp::In => Ok(Value::Bool(contains(&right, &left)?)),
        InfixOp::NotIn => Ok(Value::Bool(!contains(&right, &left)?)),
        InfixOp::Is => Ok(Value::Bool(is_check(&left, &right))),
        InfixOp::IsNot => Ok(Value::Bool(!is_check(&left, &right))),
        InfixOp::SetUnion => set_union(left, right),
        InfixOp::SetIntersect => set_intersect(left, right),
        // Lazy operators are handled by the walker.
        InfixOp::Or | InfixOp::And | InfixOp::Coalesce => Err(Error::state(
            codes::STATE_INVALID,
            "lazy operator reached strict evaluation",
        )),
    }
}

fn unsupported(op: &str, left: &Value, right: &Value) -> Error {
    Error::operator(
        codes::OP_UNSUPPORTED,
        format!(
            "`{op}` is not defined for {} and {}",
            left.type_name(),
            right.type_name()
        ),
    )
}

fn add(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::operator(codes::OP_UNSUPPORTED, "integer overflow in `+`")),
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => Ok(Value::Float(
            left.as_f64().unwrap() + right.as_f64().unwrap(),
        )),
        // String concatenation coerces the other side via the canonical
        // printer: "100" + 10 == "10010", 10 + "px" == "10px".
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::str(format!("{left}{right}")))
        }
        _ => {
            if types::is_typed(&left, types::TYPE_MONEY)
                && types::is_typed(&right, types::TYPE_MONEY)
            {
                return money::add(&left, &right, false);
            }
            if is_datetime_family(&left) && types::is_typed(&right, types::TYPE_DURATION) {
                let (months, seconds) = datetime::duration_parts(&right).unwrap_or((0, 0));
                return datetime::shift(&left, months, seconds);
            }
            if types::is_typed(&left, types::TYPE_DURATION) && is_datetime_family(&right) {
                let (months, seconds) = datetime::duration_parts(&left).unwrap_or((0, 0));
                return datetime::shift(&right, months, seconds);
            }
            if types::is_typed(&left, types::TYPE_DURATION)
                && types::is_typed(&right, types::TYPE_DURATION)
            {
                let (lm, ls) = datetime::duration_parts(&left).unwrap_or((0, 0));
                let (rm, rs) = datetime::duration_parts(&right).unwrap_or((0, 0));
                return Ok(datetime::duration_value(lm + rm, ls + rs));
            }
            // Path and URL join: `+` appends a segment and normalises.
            if types::is_typed(&left, types::TYPE_PATH) {
                let base = left.get_key("value").unwrap_or(Value::Null).to_string();
                let segment = right.to_string();
                return Ok(types::path_value(join_path(&base, &segment)));
            }
            if types::is_typed(&left, types::TYPE_URL) {
                let base = left.get_key("value").unwrap_or(Value::Null).to_string();
                let segment = right.to_string();
                return Ok(types::url_value(join_url(&base, &segment)));
            }
            Err(unsupported("+", &left, &right))
        }
    }
}

fn sub(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::operator(codes::OP_UNSUPPORTED, "integer overflow in `-`")),
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => Ok(Value::Float(
            left.as_f64().unwrap() - right.as_f64().unwrap(),
        )),
        (Value::Array(_), Value::Array(_)) => set_difference(left, right),
        (Value::Dict(_), Value::Dict(_))
            if left.type_marker().is_none() && right.type_marker().is_none() =>
        {
            set_difference(left, right)
        }
        _ => {
            if types::is_typed(&left, types::TYPE_MONEY)
                && types::is_typed(&right, types::TYPE_MONEY)
            {
                return money::add(&left, &right, true);
            }
            if is_datetime_family(&left) && types::is_typed(&right, types::TYPE_DURATION) {
                let (months, seconds) = datetime::duration_parts(&right).unwrap_or((0, 0));
                return datetime::shift(&left, -months, -seconds);
            }
            if is_datetime_family(&left) && is_datetime_family(&right) {
                return datetime::difference(&left, &right);
            }
            if types::is_typed(&left, types::TYPE_DURATION)
                && types::is_typed(&right, types::TYPE_DURATION)
            {
                let (lm, ls) = datetime::duration_parts(&left).unwrap_or((0, 0));
                let (rm, rs) = datetime::duration_parts(&right).unwrap_or((0, 0));
                return Ok(datetime::duration_value(lm - rm, ls - rs));
            }
            Err(unsupported("-", &left, &right))
        }
    }
}

fn mul(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::operator(codes::OP_UNSUPPORTED, "integer overflow in `*`")),
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => Ok(Value::Float(
            left.as_f64().unwrap() * right.as_f64().unwrap(),
        )),
        _ => {
            if types::is_typed(&left, types::TYPE_MONEY) {
                if let Some(factor) = right.as_f64() {
                    return money::scale_by(&left, factor);
                }
            }
            if types::is_typed(&right, types::TYPE_MONEY) {
                if let Some(factor) = left.as_f64() {
                    return money::scale_by(&right, factor);
                }
            }
            if types::is_typed(&left, types::TYPE_DURATION) {
                if let Some(factor) = right.as_f64() {
                    let (months, seconds) = datetime::duration_parts(&left).unwrap_or((0, 0));
                    return Ok(datetime::duration_value(
                        (months as f64 * factor) as i64,
                        (seconds as f64 * factor) as i64,
                    ));
                }
            }
            Err(unsupported("*", &left, &right))
        }
    }
}

fn div(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(Error::operator(codes::OP_DIVISION_BY_ZERO, "division by zero"))
            } else {
                Ok(Value::Int(a / b))
            }
        }
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => {
            let divisor = right.as_f64().unwrap();
            if divisor == 0.0 {
                Err(Error::operator(codes::OP_DIVISION_BY_ZERO, "division by zero"))
            } else {
                Ok(Value::Float(left.as_f64().unwrap() / divisor))
            }
        }
        _ => {
            if types::is_typed(&left, types::TYPE_MONEY) {
                if let Some(divisor) = right.as_f64() {
                    return money::divide(&left, divisor);
                }
            }
            Err(unsupported("/", &left, &right))
        }
    }
}

fn modulo(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(Error::operator(codes::OP_DIVISION_BY_ZERO, "modulo by zero"))
            } else {
                Ok(Value::Int(a % b))
            }
        }
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => {
            Ok(Value::Float(left.as_f64().unwrap() % right.as_f64().unwrap()))
        }
        _ => Err(unsupported("%", &left, &right)),
    }
}

/// `++` concatenates arrays and strings, preserving element types.
fn concat(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Array(a), Value::Array(b)) => {
            let mut out = a.borrow().clone();
            out.extend(b.borrow().iter().cloned());
            Ok(Value::array(out))
        }
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::str(format!("{left}{right}")))
        }
        _ => Err(unsupported("++", &left, &right)),
    }
}

fn range(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Range(*a, *b)),
        _ => Err(unsupported("..", &left, &right)),
    }
}

/// Append a segment to a path and normalise `.`/`..` hops and duplicate
/// separators. A leading `./` or `/` on the base survives normalisation.
pub fn join_path(base: &str, segment: &str) -> String {
    let combined = format!("{}/{}", base.trim_end_matches('/'), segment.trim_start_matches('/'));
    let absolute = combined.starts_with('/');
    let relative_here = combined.starts_with("./");
    let mut parts: Vec<&str> = Vec::new();
    for part in combined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().map(|p| *p != "..").unwrap_or(false) {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if relative_here {
        format!("./{joined}")
    } else {
        joined
    }
}

/// Append a segment to a URL's path component, leaving query and fragment
/// intact when the segment carries them.
pub fn join_url(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment.trim_start_matches('/'))
}

// ============================================================================
// Set operations
// ============================================================================

pub fn set_union(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Array(a), Value::Array(b)) => {
            let mut out: Vec<Value> = Vec::new();
            for item in a.borrow().iter().chain(b.borrow().iter()) {
                if !out.contains(item) {
                    out.push(item.clone());
                }
            }
            Ok(Value::array(out))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            let mut out = a.borrow().clone();
            for (key, value) in b.borrow().iter() {
                out.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Ok(Value::dict(out))
        }
        // Scalar `|` is boolean or.
        _ => Ok(if left.truthy() { left } else { right }),
    }
}

pub fn set_intersect(left: Value, right: Value) -> Result<Value, Error> {
    // Date ∧ time composes a datetime.
    if is_datetime_family(&left) && is_datetime_family(&right) {
        return datetime::combine(&left, &right);
    }
    match (&left, &right) {
        (Value::Array(a), Value::Array(b)) => {
            let b = b.borrow();
            let mut out = Vec::new();
            for item in a.borrow().iter() {
                if b.contains(item) && !out.contains(item) {
                    out.push(item.clone());
                }
            }
            Ok(Value::array(out))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            let b = b.borrow();
            let mut out = indexmap::IndexMap::new();
            for (key, value) in a.borrow().iter() {
                if b.contains_key(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
            Ok(Value::dict(out))
        }
        // Scalar `&` is boolean and.
        _ => Ok(if left.truthy() { right } else { left }),
    }
}

fn set_difference(left: Value, right: Value) -> Result<Value, Error> {
    match (&left, &right) {
        (Value::Array(a), Value::Array(b)) => {
            let b = b.borrow();
            let out: Vec<Value> = a
                .borrow()
                .iter()
                .filter(|item| !b.contains(item))
                .cloned()
                .collect();
            Ok(Value::array(out))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            let b = b.borrow();
            let mut out = indexmap::IndexMap::new();
            for (key, value) in a.borrow().iter() {
                if !b.contains_key(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
            Ok(Value::dict(out))
        }
        _ => Err(unsupported("-", &left, &right)),
    }
}

// ============================================================================
// Membership, identity, matching
// ============================================================================

fn contains(haystack: &Value, needle: &Value) -> Result<bool, Error> {
    match haystack {
        Value::Array(items) => Ok(items.borrow().contains(needle)),
        Value::Str(s) => match needle {
            Value::Str(sub) => Ok(s.contains(sub.as_str())),
            other => Ok(s.contains(&other.to_string())),
        },
        Value::Dict(map) => {
            let key = needle.to_string();
            Ok(map.borrow().contains_key(&key))
        }
        Value::Range(start, end) => match needle.as_int() {
            Some(n) => Ok(n >= *start && n < *end),
            None => Ok(false),
        },
        other => Err(Error::type_error(format!(
            "`in` needs an array, string, or dictionary, got {}",
            other.type_name()
        ))),
    }
}

fn is_check(left: &Value, right: &Value) -> bool {
    if types::is_typed(right, types::TYPE_SCHEMA) {
        return types::schema::record_is(left, right);
    }
    if let Value::Str(type_name) = right {
        return left.type_name() == *type_name;
    }
    false
}

fn regex_match(left: Value, right: Value) -> Result<Value, Error> {
    let text = match &left {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    };
    if !types::is_typed(&right, types::TYPE_REGEX) {
        return Err(unsupported("~", &left, &right));
    }
    let Some(re) = types::compile_regex(&right) else {
        return Err(Error::format(
            codes::FMT_NUMBER,
            "regex failed to compile",
        ));
    };
    match re.captures(&text) {
        None => Ok(Value::Null),
        Some(caps) => {
            let mut out = Vec::new();
            for group in caps.iter() {
                out.push(match group {
                    Some(m) => Value::str(m.as_str()),
                    None => Value::Null,
                });
            }
            Ok(Value::array(out))
        }
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Total order used by `<`, `>`, `sort`, and table ordering. Strings compare
/// naturally: ASCII digit runs compare numerically.
pub fn compare(left: &Value, right: &Value) -> Result<Ordering, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        _ if left.as_f64().is_some() && right.as_f64().is_some() => Ok(left
            .as_f64()
            .unwrap()
            .partial_cmp(&right.as_f64().unwrap())
            .unwrap_or(Ordering::Equal)),
        (Value::Str(a), Value::Str(b)) => Ok(natural_cmp(a, b)),
        (Value::Array(a), Value::Array(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare(x, y)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => {
            if is_datetime_family(left) && is_datetime_family(right) {
                let a = datetime::sort_key(left).unwrap_or(0);
                let b = datetime::sort_key(right).unwrap_or(0);
                return Ok(a.cmp(&b));
            }
            if types::is_typed(left, types::TYPE_MONEY)
                && types::is_typed(right, types::TYPE_MONEY)
            {
                let (a, ca, _) = money::parts(left).unwrap_or((0, String::new(), 0));
                let (b, cb, _) = money::parts(right).unwrap_or((0, String::new(), 0));
                if ca != cb {
                    return Err(Error::operator(
                        codes::OP_CURRENCY_MISMATCH,
                        format!("cannot compare {ca} and {cb}"),
                    ));
                }
                return Ok(a.cmp(&b));
            }
            if types::is_typed(left, types::TYPE_DURATION)
                && types::is_typed(right, types::TYPE_DURATION)
            {
                let a = duration_seconds_approx(left);
                let b = duration_seconds_approx(right);
                return Ok(a.cmp(&b));
            }
            Err(Error::type_error(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            )))
        }
    }
}

fn duration_seconds_approx(value: &Value) -> i64 {
    let (months, seconds) = datetime::duration_parts(value).unwrap_or((0, 0));
    months * 2_629_746 + seconds
}

pub fn is_datetime_family(value: &Value) -> bool {
    types::is_typed(value, types::TYPE_DATE)
        || types::is_typed(value, types::TYPE_TIME)
        || types::is_typed(value, types::TYPE_DATETIME)
}

/// Natural string ordering: split into runs of ASCII digits and non-digits;
/// digit runs compare numerically, other runs lexicographically.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();
    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let mut a_run = String::new();
                    while let Some(ch) = a_chars.peek().copied() {
                        if ch.is_ascii_digit() {
                            a_run.push(ch);
                            a_chars.next();
                        } else {
                            break;
                        }
                    }
                    let mut b_run = String::new();
                    while let Some(ch) = b_chars.peek().copied() {
                        if ch.is_ascii_digit() {
                            b_run.push(ch);
                            b_chars.next();
                        } else {
                            break;
                        }
                    }
                    let a_num = a_run.trim_start_matches('0');
                    let b_num = b_run.trim_start_matches('0');
                    let ord = a_num
                        .len()
                        .cmp(&b_num.len())
                        .then_with(|| a_num.cmp(b_num))
                        .then_with(|| a_run.len().cmp(&b_run.len()));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                } else {
                    let ord = x.cmp(&y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    a_chars.next();
                    b_chars.next();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_coercion() {
        assert_eq!(
            eval_infix(&InfixOp::Add, Value::Int(1), Value::Int(2)).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            eval_infix(&InfixOp::Add, Value::Int(1), Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            eval_infix(&InfixOp::Add, Value::str("100"), Value::Int(10)).unwrap(),
            Value::str("10010")
        );
        assert_eq!(
            eval_infix(&InfixOp::Add, Value::Int(10), Value::str("px")).unwrap(),
            Value::str("10px")
        );
    }

    #[test]
    fn test_integer_division_truncates() {
        assert_eq!(
            eval_infix(&InfixOp::Div, Value::Int(7), Value::Int(2)).unwrap(),
            Value::Int(3)
        );
        assert!(eval_infix(&InfixOp::Div, Value::Int(1), Value::Int(0)).is_err());
    }

    #[test]
    fn test_set_operations() {
        let a = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let b = Value::array(vec![Value::Int(2), Value::Int(3), Value::Int(4)]);
        assert_eq!(
            set_intersect(a.clone(), b.clone()).unwrap(),
            Value::array(vec![Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            set_union(a.clone(), b.clone()).unwrap(),
            Value::array(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::Int(4)
            ])
        );
        let two = Value::array(vec![Value::Int(2)]);
        assert_eq!(
            eval_infix(&InfixOp::Sub, a, two).unwrap(),
            Value::array(vec![Value::Int(1), Value::Int(3)])
        );
    }

    #[test]
    fn test_scalar_amp_pipe_stay_boolean() {
        assert_eq!(
            set_intersect(Value::Bool(true), Value::Int(5)).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            set_union(Value::Null, Value::Int(5)).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn test_natural_ordering() {
        assert_eq!(natural_cmp("file1", "file2"), Ordering::Less);
        assert_eq!(natural_cmp("file2", "file10"), Ordering::Less);
        assert_eq!(natural_cmp("file10", "file10"), Ordering::Equal);
        assert_eq!(natural_cmp("a2b", "a10b"), Ordering::Less);
        assert_eq!(natural_cmp("07", "7"), Ordering::Greater);
    }

    #[test]
    fn test_membership() {
        let xs = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert!(contains(&xs, &Value::Int(2)).unwrap());
        assert!(!contains(&xs, &Value::Int(9)).unwrap());
        assert!(contains(&Value::str("hello"), &Value::str("ell")).unwrap());
        assert!(contains(&Value::Range(0, 5), &Value::Int(4)).unwrap());
        assert!(!contains(&Value::Range(0, 5), &Value::Int(5)).unwrap());
    }

    #[test]
    fn test_concat_preserves_types() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::str("x")]);
        let joined = eval_infix(&InfixOp::Concat, a, b).unwrap();
        let Value::Array(items) = &joined else {
            panic!("expected array");
        };
        assert_eq!(items.borrow().len(), 2);
        assert_eq!(items.borrow()[0], Value::Int(1));
    }

    #[test]
    fn test_regex_match_returns_groups() {
        let re = crate::types::regex_value("(a+)(b)?", "");
        let result = regex_match(Value::str("aab"), re.clone()).unwrap();
        let Value::Array(items) = &result else {
            panic!("expected array, got {result:?}");
        };
        let items = items.borrow();
        assert_eq!(items[0], Value::str("aab"));
        assert_eq!(items[1], Value::str("aa"));
        assert_eq!(items[2], Value::str("b"));

        assert!(regex_match(Value::str("zzz"), re).unwrap().is_null());
    }

    #[test]
    fn test_path_join_normalises() {
        let base = crate::types::path_value("./static");
        let joined = add(base, Value::str("css/site.css")).unwrap();
        assert_eq!(joined.to_string(), "./static/css/site.css");
    }
}
