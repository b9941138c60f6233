//! Per-query responses returned to the host

use reduct_client::ClientError;
use serde::Serialize;
use std::collections::HashMap;

use crate::frame::Frame;

/// Frames of one query, or its error
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl DataResponse {
    pub fn frames(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            ..Default::default()
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(message.into()),
            status: Some(status),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Status reported to the host; success is 200
    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or(200)
    }
}

/// Store errors keep their status and message; others become 500
impl From<&ClientError> for DataResponse {
    fn from(err: &ClientError) -> Self {
        Self::error(err.status().unwrap_or(500), err.message())
    }
}

/// Responses of one batch keyed by query ref id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDataResponse {
    pub responses: HashMap<String, DataResponse>,
}

impl QueryDataResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ref_id: impl Into<String>, response: DataResponse) {
        self.responses.insert(ref_id.into(), response);
    }

    pub fn get(&self, ref_id: &str) -> Option<&DataResponse> {
        self.responses.get(ref_id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl FromIterator<(String, DataResponse)> for QueryDataResponse {
    fn from_iter<T: IntoIterator<Item = (String, DataResponse)>>(iter: T) -> Self {
        Self {
            responses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_from_store_error() {
        let response = DataResponse::from(&ClientError::not_found("bucket 'x' not found"));
        assert!(response.is_error());
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.error.as_deref(), Some("bucket 'x' not found"));

        let response = DataResponse::from(&ClientError::Protocol("bad header".to_string()));
        assert_eq!(response.status_code(), 500);
    }

    #[test]
    fn test_response_encoding() {
        let mut batch = QueryDataResponse::new();
        batch.insert("A", DataResponse::error(400, "missing bucket or entry"));
        batch.insert("B", DataResponse::frames(Vec::new()));

        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "responses": {
                    "A": {"error": "missing bucket or entry", "status": 400},
                    "B": {}
                }
            })
        );
    }
}
