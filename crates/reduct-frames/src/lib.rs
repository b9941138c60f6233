//! Reduct Frames - label/content normalization for ReductStore records
//!
//! This crate provides:
//! - Greedy value parsing and kind coercion
//! - JSON body sniffing and path flattening (`$.a[0].b`)
//! - Per-key series accumulation with first-sight kind pinning
//! - Record processing by mode (labels, content or both)
//! - Frame assembly and per-query responses for the host

pub mod flatten;
pub mod frame;
pub mod processor;
pub mod response;
pub mod series;
pub mod value;

pub use flatten::{flatten, flatten_body, looks_like_json, FlatMap, ROOT};
pub use frame::{build_frames, Field, FieldValues, Frame, FrameMeta, FrameType};
pub use processor::{process, process_records, Mode, ParseModeError, RecordProcessor};
pub use response::{DataResponse, QueryDataResponse};
pub use series::{Accumulator, AccumulatorStats, Series, SeriesValues};
pub use value::{coerce, parse_bool, parse_value, CoerceError, Kind, Value};
