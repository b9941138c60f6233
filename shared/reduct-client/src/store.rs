//! Store abstraction consumed by the data source adapter

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

use crate::types::{BucketInfo, EntryInfo, QueryOptions, Record, ServerInfo};
use crate::Result;

/// Forward-only sequence of records produced by one query.
///
/// Consumed exactly once; each `next()` blocks until the next record or the
/// end of the query.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record>> + Send>>;

/// Server-level operations of a record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Liveness check
    async fn is_live(&self) -> Result<()>;

    /// Server description; requires a valid token
    async fn server_info(&self) -> Result<ServerInfo>;

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// Resolve a bucket, failing with a not-found error if it does not exist
    async fn bucket(&self, name: &str) -> Result<Box<dyn Bucket>>;
}

/// A resolved bucket
#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    async fn entries(&self) -> Result<Vec<EntryInfo>>;

    /// Start a query on `entry` and return its record stream
    async fn query(&self, entry: &str, options: &QueryOptions) -> Result<RecordStream>;
}
