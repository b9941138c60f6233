//! Record processing: feeds labels and JSON content into an [`Accumulator`]

use futures_util::{Stream, TryStreamExt};
use reduct_client::{ClientError, Record};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

use crate::flatten::{flatten_body, looks_like_json};
use crate::series::Accumulator;

/// Which parts of a record become series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    LabelOnly,
    ContentOnly,
    #[default]
    LabelAndContent,
}

impl Mode {
    pub fn includes_labels(self) -> bool {
        matches!(self, Self::LabelOnly | Self::LabelAndContent)
    }

    pub fn includes_content(self) -> bool {
        matches!(self, Self::ContentOnly | Self::LabelAndContent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LabelOnly => "LabelOnly",
            Self::ContentOnly => "ContentOnly",
            Self::LabelAndContent => "LabelAndContent",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode '{0}'")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    /// Accepts the current names and the legacy `labels`/`content`/`both`.
    /// An empty string is the default mode.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::default()),
            "LabelOnly" | "labels" => Ok(Self::LabelOnly),
            "ContentOnly" | "content" => Ok(Self::ContentOnly),
            "LabelAndContent" | "both" => Ok(Self::LabelAndContent),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Single forward pass over the records of one query
#[derive(Debug)]
pub struct RecordProcessor {
    mode: Mode,
    accumulator: Accumulator,
    records: u64,
}

impl RecordProcessor {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            accumulator: Accumulator::new(),
            records: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Records seen so far
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn process_record(&mut self, record: &Record) {
        self.records += 1;

        if self.mode.includes_labels() {
            self.process_labels(record);
        }
        if self.mode.includes_content() {
            self.process_content(record);
        }
    }

    fn process_labels(&mut self, record: &Record) {
        for (key, value) in record.labels() {
            self.accumulator.append_label(key, record.timestamp(), value);
        }
    }

    fn process_content(&mut self, record: &Record) {
        let body = record.body();
        let Some(flat) = flatten_body(body) else {
            if looks_like_json(body) {
                debug!(timestamp = record.timestamp(), "Skipping unparsable JSON content");
            } else {
                trace!(
                    timestamp = record.timestamp(),
                    content_type = record.content_type(),
                    "Skipping non-JSON content"
                );
            }
            return;
        };

        for (path, leaf) in &flat {
            self.accumulator.append_json(path, record.timestamp(), leaf);
        }
    }

    pub fn finish(self) -> Accumulator {
        debug!(
            mode = %self.mode,
            records = self.records,
            series = self.accumulator.len(),
            "Records processed"
        );
        self.accumulator
    }
}

/// Drain a record stream into a fresh accumulator.
///
/// The first failed fetch aborts the evaluation with that error.
pub async fn process<S>(mut stream: S, mode: Mode) -> Result<Accumulator, ClientError>
where
    S: Stream<Item = Result<Record, ClientError>> + Unpin,
{
    let mut processor = RecordProcessor::new(mode);
    while let Some(record) = stream.try_next().await? {
        processor.process_record(&record);
    }
    Ok(processor.finish())
}

/// Synchronous variant of [`process`] for records already in memory
pub fn process_records<'a, I>(records: I, mode: Mode) -> Accumulator
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut processor = RecordProcessor::new(mode);
    for record in records {
        processor.process_record(record);
    }
    processor.finish()
}
