//! Scalar kinds, greedy value parsing and kind coercion

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Semantic kind a series is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Integer,
    Float,
    Boolean,
    String,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// A typed scalar
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Boolean(_) => Kind::Boolean,
            Self::String(_) => Kind::String,
        }
    }
}

/// Text form that parses back to the same kind and value.
///
/// Floats use the shortest round-trip representation and always keep a
/// fractional part or exponent (`6.0`, `1e300`), so they never re-parse as
/// integers.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:?}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// A value could not be forced into the established kind of its series
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce '{raw}' to {target}")]
pub struct CoerceError {
    pub raw: String,
    pub target: Kind,
}

/// Boolean literals accepted by the store: `1 t true 0 f false`, any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" => Some(true),
        "0" => Some(false),
        _ if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("t") => Some(true),
        _ if raw.eq_ignore_ascii_case("false") || raw.eq_ignore_ascii_case("f") => Some(false),
        _ => None,
    }
}

/// Infer the kind of a raw string: integer, then float, then boolean,
/// falling back to the raw text.
pub fn parse_value(raw: &str) -> Value {
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Integer(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Value::Float(v);
    }
    if let Some(v) = parse_bool(raw) {
        return Value::Boolean(v);
    }
    Value::String(raw.to_string())
}

/// Force `raw` into `target`.
///
/// - Integer: parsed as a float and truncated toward zero; non-finite fails
/// - Float: parsed as a float
/// - Boolean: a boolean literal, otherwise any number (non-zero is `true`)
/// - String: always succeeds
pub fn coerce(raw: &str, target: Kind) -> Result<Value, CoerceError> {
    let coerced = match target {
        Kind::Integer => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| Value::Integer(f.trunc() as i64)),
        Kind::Float => raw.parse::<f64>().ok().map(Value::Float),
        Kind::Boolean => parse_bool(raw)
            .or_else(|| raw.parse::<f64>().ok().map(|f| f != 0.0))
            .map(Value::Boolean),
        Kind::String => Some(Value::String(raw.to_string())),
    };

    coerced.ok_or_else(|| CoerceError {
        raw: raw.to_string(),
        target,
    })
}
