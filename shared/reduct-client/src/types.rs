//! Record and metadata types exchanged with ReductStore

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar label value attached to a record at write time.
///
/// The store transports labels as text, but writers (and the in-memory store)
/// may hand over typed scalars. Consumers stringify them before parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for LabelValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for LabelValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for LabelValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for LabelValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Label map of a record
pub type Labels = BTreeMap<String, LabelValue>;

/// Default content type when the store does not report one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One timestamped record read from an entry
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    timestamp: i64,
    labels: Labels,
    content_type: String,
    body: Bytes,
}

impl Record {
    /// Create an empty record at `timestamp` (microseconds since epoch)
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            labels: Labels::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            body: Bytes::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<LabelValue>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.content_type = content_type.into();
        self.body = body.into();
        self
    }

    /// JSON convenience for tests and demos
    pub fn with_json(self, body: &serde_json::Value) -> Self {
        self.with_body("application/json", body.to_string())
    }

    /// Microseconds since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Drop the body, keeping timestamp, labels and content type
    pub fn strip_body(mut self) -> Self {
        self.body = Bytes::new();
        self
    }
}

/// Bucket summary returned by `GET /api/v1/list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketInfo {
    pub name: String,
    pub entry_count: u64,
    pub size: u64,
    pub oldest_record: u64,
    pub latest_record: u64,
    pub is_provisioned: bool,
}

/// Entry summary returned with the bucket description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub record_count: u64,
    pub block_count: u64,
    pub oldest_record: u64,
    pub latest_record: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerDefaults {
    pub bucket: BucketSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseInfo {
    pub licensee: String,
    pub invoice: String,
    pub expiry_date: String,
    pub plan: String,
    pub device_number: u64,
}

/// Server description returned by `GET /api/v1/info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub version: String,
    pub bucket_count: u64,
    pub usage: u64,
    pub uptime: u64,
    pub oldest_record: u64,
    pub latest_record: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseInfo>,
    pub defaults: ServerDefaults,
}

/// Options of an entry query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Inclusive lower bound, microseconds
    pub start: Option<i64>,
    /// Exclusive upper bound, microseconds
    pub stop: Option<i64>,
    /// Filter condition, passed through to the store
    pub when: Option<serde_json::Value>,
    pub strict: bool,
    pub continuous: bool,
    pub ext: Option<serde_json::Value>,
    /// Only transfer timestamps, labels and content types
    pub only_metadata: bool,
    pub limit: Option<u64>,
}

impl QueryOptions {
    pub fn builder() -> QueryOptionsBuilder {
        QueryOptionsBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct QueryOptionsBuilder {
    options: QueryOptions,
}

impl QueryOptionsBuilder {
    pub fn start(mut self, start: i64) -> Self {
        self.options.start = Some(start);
        self
    }

    pub fn stop(mut self, stop: i64) -> Self {
        self.options.stop = Some(stop);
        self
    }

    pub fn when(mut self, when: Option<serde_json::Value>) -> Self {
        self.options.when = when.filter(|w| !w.is_null());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn continuous(mut self, continuous: bool) -> Self {
        self.options.continuous = continuous;
        self
    }

    pub fn ext(mut self, ext: Option<serde_json::Value>) -> Self {
        self.options.ext = ext.filter(|e| !e.is_null());
        self
    }

    pub fn only_metadata(mut self, only_metadata: bool) -> Self {
        self.options.only_metadata = only_metadata;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn build(self) -> QueryOptions {
        self.options
    }
}

/// Body of `POST /api/v1/b/{bucket}/{entry}/q`
#[derive(Debug, Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub query_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<&'a serde_json::Value>,
    pub strict: bool,
    pub continuous: bool,
    pub only_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl<'a> From<&'a QueryOptions> for QueryRequest<'a> {
    fn from(options: &'a QueryOptions) -> Self {
        Self {
            query_type: "QUERY",
            start: options.start,
            stop: options.stop,
            when: options.when.as_ref(),
            ext: options.ext.as_ref(),
            strict: options.strict,
            continuous: options.continuous,
            only_metadata: options.only_metadata,
            limit: options.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    pub id: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct BucketList {
    pub buckets: Vec<BucketInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FullBucketInfo {
    pub info: BucketInfo,
    pub entries: Vec<EntryInfo>,
}
