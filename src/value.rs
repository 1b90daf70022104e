// ABOUTME: Runtime value types for the Basil engine
// Values are a tagged sum; arrays and dictionaries are shared, mutable
// collections so closures observe mutation, and dictionaries preserve
// insertion order.

use crate::ast::{Block, Param};
use crate::config::TYPE_MARKER;
use crate::env::Environment;
use crate::error::Error;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type Dict = IndexMap<String, Value>;

/// A user function: parameter patterns, body, and the defining environment
/// captured by reference.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Rc<Environment>,
}

/// A host-provided callable with a declared arity string.
pub struct BuiltinDef {
    pub name: &'static str,
    pub arity: &'static str,
    pub func: fn(&Rc<Environment>, &[Value]) -> Result<Value, Error>,
}

impl fmt::Debug for BuiltinDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinDef({})", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Array(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    /// End-exclusive integer range, iterated lazily.
    Range(i64, i64),
    Function(Closure),
    Builtin(Rc<BuiltinDef>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn dict(map: Dict) -> Value {
        Value::Dict(Rc::new(RefCell::new(map)))
    }

    pub fn empty_dict() -> Value {
        Value::dict(IndexMap::new())
    }

    pub fn builtin(
        name: &'static str,
        arity: &'static str,
        func: fn(&Rc<Environment>, &[Value]) -> Result<Value, Error>,
    ) -> Value {
        Value::Builtin(Rc::new(BuiltinDef { name, arity, func }))
    }

    /// The falsy set is `{false, null, 0, 0.0, "", []}`; everything else is
    /// truthy, including empty dictionaries.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Int(0) => false,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            _ => true,
        }
    }

    /// The `__type` marker of a typed dictionary, if this is one.
    pub fn type_marker(&self) -> Option<String> {
        if let Value::Dict(map) = self {
            if let Some(Value::Str(tag)) = map.borrow().get(TYPE_MARKER) {
                return Some(tag.clone());
            }
        }
        None
    }

    pub fn type_name(&self) -> String {
        if let Some(tag) = self.type_marker() {
            return tag;
        }
        match self {
            Value::Int(_) => "integer".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Null => "null".to_string(),
            Value::Array(_) => "array".to_string(),
            Value::Dict(_) => "dictionary".to_string(),
            Value::Range(_, _) => "range".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Builtin(_) => "builtin".to_string(),
        }
    }

    /// Fetch a key from a dictionary value. Returns `None` for non-dicts.
    pub fn get_key(&self, key: &str) -> Option<Value> {
        if let Value::Dict(map) = self {
            map.borrow().get(key).cloned()
        } else {
            None
        }
    }

    pub fn set_key(&self, key: &str, value: Value) {
        if let Value::Dict(map) = self {
            map.borrow_mut().insert(key.to_string(), value);
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert to a serde_json value for the report envelope and `toJSON`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
            Value::Array(items) => {
                serde_json::Value::Array(items.borrow().iter().map(|v| v.to_json()).collect())
            }
            Value::Dict(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map.borrow().iter() {
                    if key == TYPE_MARKER {
                        continue;
                    }
                    out.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(out)
            }
            Value::Range(start, end) => serde_json::Value::Array(
                (*start..*end).map(serde_json::Value::from).collect(),
            ),
            Value::Function(_) | Value::Builtin(_) => serde_json::Value::Null,
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::str(s),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut dict = IndexMap::new();
                for (key, value) in map {
                    dict.insert(key.clone(), Value::from_json(value));
                }
                Value::dict(dict)
            }
        }
    }

    /// Developer-facing rendering: strings quoted, collections recursive.
    pub fn inspect(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }
}

/// Structural equality with cross numeric comparison (`1 == 1.0`).
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Range(a1, a2), Value::Range(b1, b2)) => a1 == b1 && a2 == b2,
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).map(|w| v == w).unwrap_or(false))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.def, &b.def),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The canonical printer. This is the coercion used by string concatenation,
/// so bare strings print without quotes.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() && v.abs() < 1e15 {
                    write!(f, "{}.0", *v as i64)
                } else {
                    write!(f, "{v}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "null"),
            Value::Range(start, end) => write!(f, "{start}..{end}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.inspect())?;
                }
                write!(f, "]")
            }
            Value::Dict(_) => {
                if let Some(text) = crate::types::display_typed(self) {
                    return write!(f, "{text}");
                }
                let Value::Dict(map) = self else { unreachable!() };
                write!(f, "{{")?;
                for (i, (key, value)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", value.inspect())?;
                }
                write!(f, "}}")
            }
            Value::Function(closure) => match &closure.def.name {
                Some(name) => write!(f, "<fn {name}>"),
                None => write!(f, "<fn>"),
            },
            Value::Builtin(def) => write!(f, "<builtin {}>", def.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falsy_set() {
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::Null.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::str("").truthy());
        assert!(!Value::array(vec![]).truthy());
    }

    #[test]
    fn test_truthy_values() {
        assert!(Value::Int(-1).truthy());
        assert!(Value::str(" ").truthy());
        assert!(Value::empty_dict().truthy());
        assert!(Value::array(vec![Value::Null]).truthy());
    }

    #[test]
    fn test_cross_numeric_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.5));
    }

    #[test]
    fn test_printer_coerces_strings_bare() {
        assert_eq!(Value::str("px").to_string(), "px");
        assert_eq!(Value::Int(10).to_string(), "10");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
    }

    #[test]
    fn test_collection_printing_quotes_strings() {
        let arr = Value::array(vec![Value::str("a"), Value::Int(1)]);
        assert_eq!(arr.to_string(), "[\"a\", 1]");
    }

    #[test]
    fn test_dict_iteration_order_is_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("z".to_string(), Value::Int(1));
        map.insert("a".to_string(), Value::Int(2));
        map.insert("m".to_string(), Value::Int(3));
        let dict = Value::dict(map);
        if let Value::Dict(map) = &dict {
            let keys: Vec<_> = map.borrow().keys().cloned().collect();
            assert_eq!(keys, vec!["z", "a", "m"]);
        }
    }

    #[test]
    fn test_json_round_trip() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": [true, null, "x"]}"#).unwrap();
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), json);
    }
}
