//! Data frames in the host's wide time-series layout
//!
//! Each series becomes one frame named after its key with a `time` field and a
//! `value` field typed by the series kind.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::series::{Accumulator, Series, SeriesValues};
use crate::value::Kind;

pub const TIME_FIELD: &str = "time";
pub const VALUE_FIELD: &str = "value";

/// Column of a frame field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Bool(Vec<bool>),
    String(Vec<String>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Time(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field type in the frame schema
    pub fn field_type(&self) -> &'static str {
        match self {
            Self::Time(_) => "time",
            Self::Int64(_) | Self::Float64(_) => "number",
            Self::Bool(_) => "boolean",
            Self::String(_) => "string",
        }
    }

    /// Storage type reported as `typeInfo.frame`
    pub fn frame_type(&self) -> &'static str {
        match self {
            Self::Time(_) => "time.Time",
            Self::Int64(_) => "int64",
            Self::Float64(_) => "float64",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
        }
    }

    pub fn as_times(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            Self::Time(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int64(&self) -> Option<&[i64]> {
        match self {
            Self::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float64(&self) -> Option<&[f64]> {
        match self {
            Self::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            Self::Bool(v) => Some(v),
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

impl FieldValues {
    /// Keep the rows whose `keep` flag is set
    fn retain_rows(&mut self, keep: &[bool]) {
        fn retain<T>(values: &mut Vec<T>, keep: &[bool]) {
            let mut flags = keep.iter();
            values.retain(|_| flags.next().copied().unwrap_or(true));
        }

        match self {
            Self::Time(v) => retain(v, keep),
            Self::Int64(v) => retain(v, keep),
            Self::Float64(v) => retain(v, keep),
            Self::Bool(v) => retain(v, keep),
            Self::String(v) => retain(v, keep),
        }
    }
}

impl From<SeriesValues> for FieldValues {
    fn from(values: SeriesValues) -> Self {
        match values {
            SeriesValues::Integer(v) => Self::Int64(v),
            SeriesValues::Float(v) => Self::Float64(v),
            SeriesValues::Boolean(v) => Self::Bool(v),
            SeriesValues::String(v) => Self::String(v),
        }
    }
}

/// Times as epoch milliseconds, non-finite floats as `null`
impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Time(v) => serializer.collect_seq(v.iter().map(|t| t.timestamp_millis())),
            Self::Int64(v) => v.serialize(serializer),
            Self::Float64(v) => {
                serializer.collect_seq(v.iter().map(|f| if f.is_finite() { Some(*f) } else { None }))
            }
            Self::Bool(v) => v.serialize(serializer),
            Self::String(v) => v.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FrameType {
    #[default]
    #[serde(rename = "timeseries-wide")]
    TimeSeriesWide,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameMeta {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
}

/// Named set of equal-length fields
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
    pub meta: FrameMeta,
}

impl Frame {
    /// `time` + `value` frame for one series
    ///
    /// Points whose timestamp is outside the representable range are dropped.
    pub fn from_series(name: impl Into<String>, series: Series) -> Self {
        let name = name.into();
        let (timestamps, values) = series.into_parts();
        let mut values = FieldValues::from(values);

        let mut times = Vec::with_capacity(timestamps.len());
        let mut keep = Vec::with_capacity(timestamps.len());
        for micros in timestamps {
            match DateTime::from_timestamp_micros(micros) {
                Some(time) => {
                    times.push(time);
                    keep.push(true);
                }
                None => {
                    debug!(series = %name, timestamp = micros, "Dropping point with out-of-range timestamp");
                    keep.push(false);
                }
            }
        }
        if times.len() != keep.len() {
            values.retain_rows(&keep);
        }

        Self {
            name,
            fields: vec![
                Field::new(TIME_FIELD, FieldValues::Time(times)),
                Field::new(VALUE_FIELD, values),
            ],
            meta: FrameMeta::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.fields.first().map_or(0, |f| f.values.len())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn time_field(&self) -> Option<&Field> {
        self.field(TIME_FIELD)
    }

    pub fn value_field(&self) -> Option<&Field> {
        self.field(VALUE_FIELD)
    }

    /// Kind of the value field
    pub fn value_kind(&self) -> Option<Kind> {
        self.value_field().and_then(|f| match f.values {
            FieldValues::Time(_) => None,
            FieldValues::Int64(_) => Some(Kind::Integer),
            FieldValues::Float64(_) => Some(Kind::Float),
            FieldValues::Bool(_) => Some(Kind::Boolean),
            FieldValues::String(_) => Some(Kind::String),
        })
    }
}

#[derive(Serialize)]
struct WireFrame<'a> {
    schema: WireSchema<'a>,
    data: WireData<'a>,
}

#[derive(Serialize)]
struct WireSchema<'a> {
    name: &'a str,
    meta: &'a FrameMeta,
    fields: Vec<WireField<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireField<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    field_type: &'static str,
    type_info: WireTypeInfo,
}

#[derive(Serialize)]
struct WireTypeInfo {
    frame: &'static str,
}

#[derive(Serialize)]
struct WireData<'a> {
    values: Vec<&'a FieldValues>,
}

/// Host JSON frame encoding: `{"schema": {..}, "data": {"values": [..]}}`
impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireFrame {
            schema: WireSchema {
                name: &self.name,
                meta: &self.meta,
                fields: self
                    .fields
                    .iter()
                    .map(|f| WireField {
                        name: &f.name,
                        field_type: f.values.field_type(),
                        type_info: WireTypeInfo {
                            frame: f.values.frame_type(),
                        },
                    })
                    .collect(),
            },
            data: WireData {
                values: self.fields.iter().map(|f| &f.values).collect(),
            },
        }
        .serialize(serializer)
    }
}

/// One frame per accumulated series, in unspecified order
pub fn build_frames(accumulator: Accumulator) -> Vec<Frame> {
    accumulator
        .into_series()
        .into_iter()
        .map(|(key, series)| Frame::from_series(key, series))
        .collect()
}
