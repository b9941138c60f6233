//! Per-key typed series and the accumulator that builds them

use reduct_client::LabelValue;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::debug;

use crate::value::{coerce, parse_value, Kind, Value};

/// Typed column of a series
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Boolean(Vec<bool>),
    String(Vec<String>),
}

impl SeriesValues {
    fn empty(kind: Kind) -> Self {
        match kind {
            Kind::Integer => Self::Integer(Vec::new()),
            Kind::Float => Self::Float(Vec::new()),
            Kind::Boolean => Self::Boolean(Vec::new()),
            Kind::String => Self::String(Vec::new()),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Boolean(_) => Kind::Boolean,
            Self::String(_) => Kind::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Integer(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a value of the column's kind; any other kind is refused.
    fn push(&mut self, value: Value) -> bool {
        match (self, value) {
            (Self::Integer(column), Value::Integer(v)) => column.push(v),
            (Self::Float(column), Value::Float(v)) => column.push(v),
            (Self::Boolean(column), Value::Boolean(v)) => column.push(v),
            (Self::String(column), Value::String(v)) => column.push(v),
            _ => return false,
        }
        true
    }

    pub fn as_integers(&self) -> Option<&[i64]> {
        match self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_booleans(&self) -> Option<&[bool]> {
        match self {
            Self::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Time-indexed values of one key, pinned to the kind of its first value
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    timestamps: Vec<i64>,
    values: SeriesValues,
}

impl Series {
    fn new(kind: Kind) -> Self {
        Self {
            timestamps: Vec::new(),
            values: SeriesValues::empty(kind),
        }
    }

    fn push(&mut self, timestamp: i64, value: Value) -> bool {
        if self.values.push(value) {
            self.timestamps.push(timestamp);
            true
        } else {
            false
        }
    }

    pub fn kind(&self) -> Kind {
        self.values.kind()
    }

    /// Microseconds since the Unix epoch, in arrival order
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn values(&self) -> &SeriesValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn into_parts(self) -> (Vec<i64>, SeriesValues) {
        (self.timestamps, self.values)
    }
}

/// Point counters of one evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulatorStats {
    /// Points stored, including coerced ones
    pub appended: u64,
    /// Points stored after coercion to the series kind
    pub coerced: u64,
    /// Points that could not be coerced
    pub dropped: u64,
}

/// Owns one [`Series`] per key for a single query evaluation.
///
/// A key's kind is fixed by its first value. Later values of another kind are
/// coerced from their text form into that kind, or dropped when coercion
/// fails.
#[derive(Debug, Default)]
pub struct Accumulator {
    series: HashMap<String, Series>,
    stats: AccumulatorStats,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a label value: stringified, then re-parsed
    pub fn append_label(&mut self, key: &str, timestamp: i64, value: &LabelValue) {
        let raw = value.to_string();
        let parsed = parse_value(&raw);
        self.append(key, timestamp, parsed, &raw);
    }

    /// Append a flattened JSON leaf using its JSON-native kind.
    ///
    /// Numbers are always Float. `null` and containers carry no value.
    pub fn append_json(&mut self, key: &str, timestamp: i64, value: &JsonValue) {
        let (typed, raw) = match value {
            JsonValue::Bool(v) => (Value::Boolean(*v), v.to_string()),
            JsonValue::Number(n) => match n.as_f64() {
                Some(v) => (Value::Float(v), n.to_string()),
                None => return,
            },
            JsonValue::String(s) => (Value::String(s.clone()), s.clone()),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => return,
        };
        self.append(key, timestamp, typed, &raw);
    }

    fn append(&mut self, key: &str, timestamp: i64, value: Value, raw: &str) {
        let series = self
            .series
            .entry(key.to_string())
            .or_insert_with(|| Series::new(value.kind()));

        let target = series.kind();
        if value.kind() == target {
            series.push(timestamp, value);
            self.stats.appended += 1;
            return;
        }

        debug!(key, from = %value.kind(), to = %target, "Type change detected");
        match coerce(raw, target) {
            Ok(coerced) => {
                series.push(timestamp, coerced);
                self.stats.appended += 1;
                self.stats.coerced += 1;
            }
            Err(err) => {
                debug!(key, error = %err, "Dropping point");
                self.stats.dropped += 1;
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Series> {
        self.series.get(key)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Series keys in unspecified order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.series.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn stats(&self) -> AccumulatorStats {
        self.stats
    }

    pub fn into_series(self) -> HashMap<String, Series> {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_value_pins_kind() {
        let mut acc = Accumulator::new();
        acc.append_label("n", 1, &LabelValue::from("42"));
        acc.append_label("n", 2, &LabelValue::from("21.9"));
        acc.append_label("n", 3, &LabelValue::from("badInt"));

        let series = acc.get("n").unwrap();
        assert_eq!(series.kind(), Kind::Integer);
        assert_eq!(series.values().as_integers(), Some(&[42, 21][..]));
        assert_eq!(series.timestamps(), &[1, 2]);

        let stats = acc.stats();
        assert_eq!(stats.appended, 2);
        assert_eq!(stats.coerced, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_typed_labels_are_stringified_first() {
        let mut acc = Accumulator::new();
        acc.append_label("b", 1, &LabelValue::Bool(true));
        acc.append_label("b", 2, &LabelValue::Int(0));
        acc.append_label("f", 1, &LabelValue::Float(2.5));
        acc.append_label("f", 2, &LabelValue::Int(3));

        assert_eq!(acc.get("b").unwrap().values().as_booleans(), Some(&[true, false][..]));
        assert_eq!(acc.get("f").unwrap().values().as_floats(), Some(&[2.5, 3.0][..]));
    }

    #[test]
    fn test_json_numbers_are_floats_and_strings_stay_strings() {
        let mut acc = Accumulator::new();
        acc.append_json("$.count", 1, &json!(42));
        acc.append_json("$.str_number", 1, &json!("123"));

        assert_eq!(acc.get("$.count").unwrap().kind(), Kind::Float);
        assert_eq!(acc.get("$.str_number").unwrap().kind(), Kind::String);
        assert_eq!(
            acc.get("$.str_number").unwrap().values().as_strings(),
            Some(&["123".to_string()][..])
        );
    }

    #[test]
    fn test_json_drift_coerces_from_text() {
        let mut acc = Accumulator::new();
        acc.append_json("$.v", 1, &json!(1.5));
        acc.append_json("$.v", 2, &json!("2.5"));
        acc.append_json("$.v", 3, &json!(true));
        acc.append_json("$.s", 1, &json!("x"));
        acc.append_json("$.s", 2, &json!(7));

        assert_eq!(acc.get("$.v").unwrap().values().as_floats(), Some(&[1.5, 2.5][..]));
        assert_eq!(
            acc.get("$.s").unwrap().values().as_strings(),
            Some(&["x".to_string(), "7".to_string()][..])
        );
    }

    #[test]
    fn test_null_never_establishes_a_kind() {
        let mut acc = Accumulator::new();
        acc.append_json("$.x", 1, &JsonValue::Null);
        assert!(acc.get("$.x").is_none());

        acc.append_json("$.x", 2, &json!(false));
        acc.append_json("$.x", 3, &JsonValue::Null);
        let series = acc.get("$.x").unwrap();
        assert_eq!(series.kind(), Kind::Boolean);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut acc = Accumulator::new();
        acc.append_label("a", 1, &LabelValue::from("1"));
        acc.append_label("b", 1, &LabelValue::from("x"));
        acc.append_label("a", 2, &LabelValue::from("2"));

        let mut keys: Vec<&str> = acc.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(acc.get("a").unwrap().len(), 2);
        assert_eq!(acc.get("b").unwrap().len(), 1);
    }
}
