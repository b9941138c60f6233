//! In-memory record store
//!
//! Implements the same traits as [`ReductClient`](crate::ReductClient) so the
//! adapter can be exercised without a running server. Filter conditions are
//! validated for shape (they must be JSON objects) but not evaluated; only
//! the time range, `only_metadata`, `limit` and a `$limit` key are honored.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::store::{Bucket, RecordStore, RecordStream};
use crate::types::{BucketInfo, EntryInfo, QueryOptions, Record, ServerInfo};
use crate::{ClientError, Result};

type Entries = BTreeMap<String, Vec<Record>>;

#[derive(Default)]
struct MemoryInner {
    buckets: BTreeMap<String, Entries>,
    liveness_error: Option<String>,
    info_error: Option<String>,
    // (records yielded before failing, message)
    stream_error: Option<(usize, String)>,
}

/// In-memory record store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, name: &str) {
        self.inner.write().buckets.entry(name.to_string()).or_default();
    }

    /// Append a record, creating bucket and entry on demand.
    /// Records are kept in timestamp order.
    pub fn write(&self, bucket: &str, entry: &str, record: Record) {
        let mut inner = self.inner.write();
        let records = inner
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .entry(entry.to_string())
            .or_default();
        let pos = records.partition_point(|r| r.timestamp() <= record.timestamp());
        records.insert(pos, record);
    }

    /// Make `is_live` fail with `message`
    pub fn fail_liveness(&self, message: impl Into<String>) {
        self.inner.write().liveness_error = Some(message.into());
    }

    /// Make `server_info` fail with a 401 carrying `message`
    pub fn fail_info(&self, message: impl Into<String>) {
        self.inner.write().info_error = Some(message.into());
    }

    /// Make every query stream fail after yielding `after` records
    pub fn fail_streams_after(&self, after: usize, message: impl Into<String>) {
        self.inner.write().stream_error = Some((after, message.into()));
    }

    fn bucket_info(name: &str, entries: &Entries) -> BucketInfo {
        let mut info = BucketInfo {
            name: name.to_string(),
            entry_count: entries.len() as u64,
            ..Default::default()
        };
        for entry in entries.values() {
            let entry = Self::entry_info("", entry);
            info.size += entry.size;
            if info.oldest_record == 0 || (entry.oldest_record != 0 && entry.oldest_record < info.oldest_record) {
                info.oldest_record = entry.oldest_record;
            }
            info.latest_record = info.latest_record.max(entry.latest_record);
        }
        info
    }

    fn entry_info(name: &str, records: &[Record]) -> EntryInfo {
        EntryInfo {
            name: name.to_string(),
            size: records.iter().map(|r| r.body().len() as u64).sum(),
            record_count: records.len() as u64,
            block_count: u64::from(!records.is_empty()),
            oldest_record: records.first().map(|r| r.timestamp().max(0) as u64).unwrap_or(0),
            latest_record: records.last().map(|r| r.timestamp().max(0) as u64).unwrap_or(0),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn is_live(&self) -> Result<()> {
        match &self.inner.read().liveness_error {
            Some(message) => Err(ClientError::Protocol(message.clone())),
            None => Ok(()),
        }
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        let inner = self.inner.read();
        if let Some(message) = &inner.info_error {
            return Err(ClientError::api(401, message.clone()));
        }

        let buckets: Vec<BucketInfo> = inner
            .buckets
            .iter()
            .map(|(name, entries)| Self::bucket_info(name, entries))
            .collect();

        Ok(ServerInfo {
            version: "memory".to_string(),
            bucket_count: buckets.len() as u64,
            usage: buckets.iter().map(|b| b.size).sum(),
            oldest_record: buckets
                .iter()
                .map(|b| b.oldest_record)
                .filter(|t| *t != 0)
                .min()
                .unwrap_or(0),
            latest_record: buckets.iter().map(|b| b.latest_record).max().unwrap_or(0),
            ..Default::default()
        })
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        Ok(self
            .inner
            .read()
            .buckets
            .iter()
            .map(|(name, entries)| Self::bucket_info(name, entries))
            .collect())
    }

    async fn bucket(&self, name: &str) -> Result<Box<dyn Bucket>> {
        if !self.inner.read().buckets.contains_key(name) {
            return Err(ClientError::not_found(format!("bucket '{}' not found", name)));
        }
        Ok(Box::new(MemoryBucket {
            store: self.clone(),
            name: name.to_string(),
        }))
    }
}

/// Bucket handle of [`MemoryStore`]
pub struct MemoryBucket {
    store: MemoryStore,
    name: String,
}

impl MemoryBucket {
    fn select(&self, entry: &str, options: &QueryOptions) -> Result<Vec<Record>> {
        let inner = self.store.inner.read();
        let entries = inner
            .buckets
            .get(&self.name)
            .ok_or_else(|| ClientError::not_found(format!("bucket '{}' not found", self.name)))?;
        let records = entries.get(entry).ok_or_else(|| {
            ClientError::not_found(format!(
                "entry '{}' not found in bucket '{}'",
                entry, self.name
            ))
        })?;

        let mut limit = options.limit;
        if let Some(when) = &options.when {
            let condition = when.as_object().ok_or_else(|| {
                ClientError::api(422, "Filter condition must be a JSON object")
            })?;
            if let Some(value) = condition.get("$limit") {
                let value = value
                    .as_u64()
                    .ok_or_else(|| ClientError::api(422, "$limit must be an unsigned integer"))?;
                limit = Some(limit.map_or(value, |l| l.min(value)));
            }
        }

        let selected = records
            .iter()
            .filter(|r| options.start.map_or(true, |start| r.timestamp() >= start))
            .filter(|r| options.stop.map_or(true, |stop| r.timestamp() < stop))
            .take(limit.map_or(usize::MAX, |l| l as usize))
            .map(|r| {
                if options.only_metadata {
                    r.clone().strip_body()
                } else {
                    r.clone()
                }
            })
            .collect();

        Ok(selected)
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entries(&self) -> Result<Vec<EntryInfo>> {
        let inner = self.store.inner.read();
        let entries = inner
            .buckets
            .get(&self.name)
            .ok_or_else(|| ClientError::not_found(format!("bucket '{}' not found", self.name)))?;
        Ok(entries
            .iter()
            .map(|(name, records)| MemoryStore::entry_info(name, records))
            .collect())
    }

    async fn query(&self, entry: &str, options: &QueryOptions) -> Result<RecordStream> {
        let records = self.select(entry, options)?;
        let failure = self.store.inner.read().stream_error.clone();

        let items: Vec<Result<Record>> = match failure {
            Some((after, message)) => records
                .into_iter()
                .take(after)
                .map(Ok)
                .chain(std::iter::once(Err(ClientError::api(500, message))))
                .collect(),
            None => records.into_iter().map(Ok).collect(),
        };

        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn store_with_records() -> MemoryStore {
        let store = MemoryStore::new();
        for ts in [30, 10, 20] {
            store.write(
                "bucket",
                "entry",
                Record::new(ts).with_label("ts", ts).with_body("text/plain", "x"),
            );
        }
        store
    }

    async fn collect(stream: RecordStream) -> Vec<Result<Record>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_query_returns_records_in_time_order() {
        let store = store_with_records();
        let bucket = store.bucket("bucket").await.unwrap();
        let records = collect(bucket.query("entry", &QueryOptions::default()).await.unwrap()).await;

        let timestamps: Vec<i64> = records.iter().map(|r| r.as_ref().unwrap().timestamp()).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_query_honors_range_and_metadata() {
        let store = store_with_records();
        let bucket = store.bucket("bucket").await.unwrap();
        let options = QueryOptions::builder().start(10).stop(30).only_metadata(true).build();
        let records = collect(bucket.query("entry", &options).await.unwrap()).await;

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.as_ref().unwrap().body().is_empty()));
    }

    #[tokio::test]
    async fn test_missing_bucket_and_entry() {
        let store = store_with_records();
        let err = store.bucket("missing").await.err().unwrap();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), "bucket 'missing' not found");

        let bucket = store.bucket("bucket").await.unwrap();
        let err = bucket.query("missing", &QueryOptions::default()).await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_condition_limit_and_shape() {
        let store = store_with_records();
        let bucket = store.bucket("bucket").await.unwrap();

        let options = QueryOptions::builder()
            .when(Some(serde_json::json!({"$limit": 1})))
            .build();
        assert_eq!(collect(bucket.query("entry", &options).await.unwrap()).await.len(), 1);

        let options = QueryOptions::builder()
            .when(Some(serde_json::json!(["not", "an", "object"])))
            .build();
        let err = bucket.query("entry", &options).await.err().unwrap();
        assert_eq!(err.status(), Some(422));
    }

    #[tokio::test]
    async fn test_stream_failure_after_records() {
        let store = store_with_records();
        store.fail_streams_after(1, "storage fault");
        let bucket = store.bucket("bucket").await.unwrap();
        let items = collect(bucket.query("entry", &QueryOptions::default()).await.unwrap()).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().err().unwrap().message(), "storage fault");
    }

    #[tokio::test]
    async fn test_server_info_and_listing() {
        let store = store_with_records();
        store.create_bucket("empty");

        let info = tokio_test::assert_ok!(store.server_info().await);
        assert_eq!(info.bucket_count, 2);
        assert_eq!(info.oldest_record, 10);
        assert_eq!(info.latest_record, 30);

        let buckets = store.list_buckets().await.unwrap();
        assert_eq!(buckets.len(), 2);

        let entries = store.bucket("bucket").await.unwrap().entries().await.unwrap();
        assert_eq!(entries[0].name, "entry");
        assert_eq!(entries[0].record_count, 3);

        store.fail_info("invalid token");
        assert_eq!(store.server_info().await.err().unwrap().status(), Some(401));
    }
}
