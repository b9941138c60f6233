//! Batched read protocol
//!
//! A batch response carries one `x-reduct-time-{ts}` header per record:
//!
//! ```text
//! x-reduct-time-1700000000000000: 12,application/json,seq=1,note="a,b"
//! ```
//!
//! The bodies are concatenated in timestamp order. `x-reduct-last: true`
//! marks the final batch of a query.

use bytes::Bytes;

use crate::types::{LabelValue, Labels, Record, DEFAULT_CONTENT_TYPE};
use crate::{ClientError, Result};

pub const TIME_HEADER_PREFIX: &str = "x-reduct-time-";
pub const LAST_HEADER: &str = "x-reduct-last";
pub const ERROR_HEADER: &str = "x-reduct-error";

/// Metadata of one batched record
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordMeta {
    pub content_length: usize,
    pub content_type: String,
    pub labels: Labels,
}

/// Parse the value of an `x-reduct-time-*` header
pub(crate) fn parse_record_header(value: &str) -> Result<RecordMeta> {
    let (length, rest) = value.split_once(',').unwrap_or((value, ""));
    let content_length = length
        .trim()
        .parse::<usize>()
        .map_err(|e| ClientError::Protocol(format!("invalid content length '{}': {}", length, e)))?;

    let (content_type, mut rest) = rest.split_once(',').unwrap_or((rest, ""));
    let content_type = match content_type.trim() {
        "" => DEFAULT_CONTENT_TYPE.to_string(),
        ct => ct.to_string(),
    };

    let mut labels = Labels::new();
    while let Some((key, value)) = rest.split_once('=') {
        let key = key.trim().to_string();
        if let Some(quoted) = value.strip_prefix('"') {
            let (value, tail) = quoted
                .split_once('"')
                .ok_or_else(|| ClientError::Protocol(format!("unterminated label value for '{}'", key)))?;
            labels.insert(key, LabelValue::String(value.to_string()));
            rest = tail.trim_start().trim_start_matches(',');
        } else if let Some((value, tail)) = value.split_once(',') {
            labels.insert(key, LabelValue::String(value.trim().to_string()));
            rest = tail;
        } else {
            labels.insert(key, LabelValue::String(value.trim().to_string()));
            break;
        }
    }

    Ok(RecordMeta {
        content_length,
        content_type,
        labels,
    })
}

/// Split a batch response into records.
///
/// Returns the records in timestamp order and whether this was the last batch.
/// With `head` set the body is expected to be empty.
pub(crate) fn parse_batch<'a>(
    headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    body: Bytes,
    head: bool,
) -> Result<(Vec<Record>, bool)> {
    let mut metas = Vec::new();
    let mut last = false;

    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if let Some(ts) = name.strip_prefix(TIME_HEADER_PREFIX) {
            let timestamp = ts
                .parse::<i64>()
                .map_err(|e| ClientError::Protocol(format!("invalid timestamp '{}': {}", ts, e)))?;
            metas.push((timestamp, parse_record_header(value)?));
        } else if name == LAST_HEADER {
            last = value.trim() == "true";
        }
    }

    metas.sort_by_key(|(ts, _)| *ts);

    let mut offset = 0usize;
    let mut records = Vec::with_capacity(metas.len());
    for (timestamp, meta) in metas {
        let record_body = if head {
            Bytes::new()
        } else {
            let end = offset
                .checked_add(meta.content_length)
                .filter(|end| *end <= body.len())
                .ok_or_else(|| {
                    ClientError::Protocol(format!(
                        "batch body too short: record at {} needs {} bytes, {} left",
                        timestamp,
                        meta.content_length,
                        body.len().saturating_sub(offset)
                    ))
                })?;
            let slice = body.slice(offset..end);
            offset = end;
            slice
        };

        records.push(
            Record::new(timestamp)
                .with_labels(meta.labels)
                .with_body(meta.content_type, record_body),
        );
    }

    Ok((records, last))
}
