//! Resource calls made by the query editor

use async_trait::async_trait;
use futures_util::StreamExt;
use reduct_client::QueryOptions;
use reduct_ds_core::{CallResourceHandler, CallResourceRequest, CallResourceResponse, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::datasource::ReductDatasource;

/// Interval substituted for `$__interval` when validating conditions
pub const VALIDATION_INTERVAL: &str = "1s";

const INTERVAL_MACRO: &str = "$__interval";

#[derive(Debug, Deserialize)]
struct ListEntriesPayload {
    #[serde(default)]
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct ValidateConditionPayload {
    #[serde(default)]
    bucket: String,
    #[serde(default)]
    entry: String,
    #[serde(default)]
    condition: Value,
}

/// Replace every `$__interval` string, at any depth, with `interval`
pub fn replace_interval_macros(value: Value, interval: &str) -> Value {
    match value {
        Value::String(s) if s == INTERVAL_MACRO => Value::String(interval.to_string()),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| replace_interval_macros(v, interval))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, replace_interval_macros(v, interval)))
                .collect(),
        ),
        other => other,
    }
}

/// Accept an object, a JSON string holding an object, or nothing
pub fn parse_and_normalize_condition(condition: Value) -> std::result::Result<Map<String, Value>, String> {
    let parsed = match condition {
        Value::Null => return Ok(Map::new()),
        Value::Object(map) => map,
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(Map::new());
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err("invalid JSON syntax: expected object for condition".to_string()),
                Err(e) => return Err(format!("invalid JSON syntax: {}", e)),
            }
        }
        _ => return Err("invalid condition: expected object or JSON string".to_string()),
    };

    match replace_interval_macros(Value::Object(parsed), VALIDATION_INTERVAL) {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn validation_result(error: Option<String>) -> CallResourceResponse {
    match error {
        None => CallResourceResponse::json(200, &json!({ "valid": true })),
        Some(message) => CallResourceResponse::json(200, &json!({ "valid": false, "error": message })),
    }
}

impl ReductDatasource {
    async fn list_buckets(&self) -> CallResourceResponse {
        match self.store().list_buckets().await {
            Ok(buckets) => CallResourceResponse::json(200, &buckets),
            Err(e) => {
                error!(error = %e, "Failed to get buckets");
                CallResourceResponse::error(500, format!("error: {}", e))
            }
        }
    }

    async fn list_entries(&self, body: &[u8]) -> CallResourceResponse {
        let bucket_name = match serde_json::from_slice::<ListEntriesPayload>(body) {
            Ok(payload) if !payload.bucket.is_empty() => payload.bucket,
            _ => {
                warn!("Missing or invalid bucket in request");
                return CallResourceResponse::error(400, "missing or invalid 'bucket' in request");
            }
        };

        let bucket = match self.store().bucket(&bucket_name).await {
            Ok(bucket) => bucket,
            Err(e) => {
                error!(bucket = %bucket_name, error = %e, "Failed to get bucket");
                return CallResourceResponse::error(500, format!("error getting bucket: {}", e));
            }
        };

        match bucket.entries().await {
            Ok(entries) => CallResourceResponse::json(200, &entries),
            Err(e) => {
                error!(error = %e, "Failed to list entries");
                CallResourceResponse::error(500, "error getting entries")
            }
        }
    }

    async fn validate_condition(&self, body: &[u8]) -> CallResourceResponse {
        let payload = match serde_json::from_slice::<ValidateConditionPayload>(body) {
            Ok(p) if !p.bucket.is_empty() && !p.entry.is_empty() => p,
            _ => {
                warn!("Missing or invalid bucket/entry in request");
                return CallResourceResponse::error(
                    400,
                    "missing or invalid 'bucket' or 'entry' in request",
                );
            }
        };

        let mut condition = match parse_and_normalize_condition(payload.condition) {
            Ok(condition) => condition,
            Err(message) => return validation_result(Some(message)),
        };
        condition.insert("$limit".to_string(), json!(1));

        let bucket = match self.store().bucket(&payload.bucket).await {
            Ok(bucket) => bucket,
            Err(e) => {
                error!(bucket = %payload.bucket, error = %e, "Failed to get bucket");
                let message = match e.status() {
                    Some(_) => e.message(),
                    None => format!("Failed to access bucket '{}'", payload.bucket),
                };
                return validation_result(Some(message));
            }
        };

        let options = QueryOptions::builder()
            .when(Some(Value::Object(condition)))
            .build();

        match bucket.query(&payload.entry, &options).await {
            Ok(mut stream) => {
                // drain the single-record check
                while stream.next().await.is_some() {}
                validation_result(None)
            }
            Err(e) => {
                debug!(error = %e, "Query validation failed");
                let message = match e.status() {
                    Some(_) => e.message(),
                    None => "Query validation failed".to_string(),
                };
                validation_result(Some(message))
            }
        }
    }

    async fn server_info(&self) -> CallResourceResponse {
        if let Err(e) = self.store().is_live().await {
            error!(error = %e, "Failed to check server status");
            return CallResourceResponse::error(500, "server is not accessible");
        }

        match self.store().server_info().await {
            Ok(info) => CallResourceResponse::json(200, &info),
            Err(e) => {
                error!(error = %e, "Failed to get server info");
                CallResourceResponse::error(500, "failed to get server info")
            }
        }
    }
}

#[async_trait]
impl CallResourceHandler for ReductDatasource {
    async fn call_resource(&self, request: CallResourceRequest) -> Result<CallResourceResponse> {
        debug!(path = %request.path, method = %request.method, "Received CallResource");

        let response = match request.path.as_str() {
            "listBuckets" => self.list_buckets().await,
            "listEntries" => self.list_entries(&request.body).await,
            "validateCondition" => self.validate_condition(&request.body).await,
            "serverInfo" => self.server_info().await,
            path => {
                warn!(path, "Unknown resource path");
                CallResourceResponse::text(404, format!("unknown resource path: {}", path))
            }
        };

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_macros_are_replaced_at_any_depth() {
        let condition = parse_and_normalize_condition(json!(
            r#"{ "$each_t": "$__interval", "nested": ["$__interval", {"inner": "$__interval"}] }"#
        ))
        .unwrap();

        assert_eq!(
            Value::Object(condition),
            json!({"$each_t": "1s", "nested": ["1s", {"inner": "1s"}]})
        );
    }

    #[test]
    fn test_object_condition_keeps_other_values() {
        let condition =
            parse_and_normalize_condition(json!({"&label": {"$eq": "$__interval_ms"}, "$limit": 10})).unwrap();
        assert_eq!(condition["&label"], json!({"$eq": "$__interval_ms"}));
        assert_eq!(condition["$limit"], json!(10));
    }

    #[test]
    fn test_empty_conditions() {
        assert!(parse_and_normalize_condition(Value::Null).unwrap().is_empty());
        assert!(parse_and_normalize_condition(json!("   ")).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_conditions() {
        let err = parse_and_normalize_condition(json!("{not json")).unwrap_err();
        assert!(err.starts_with("invalid JSON syntax"));

        let err = parse_and_normalize_condition(json!("[1, 2]")).unwrap_err();
        assert_eq!(err, "invalid JSON syntax: expected object for condition");

        let err = parse_and_normalize_condition(json!(42)).unwrap_err();
        assert_eq!(err, "invalid condition: expected object or JSON string");
    }
}
