//! HTTP mapping of data source errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reduct_ds_core::DatasourceError;
use serde_json::json;

/// Error returned by the HTTP handlers
#[derive(Debug)]
pub struct ApiError(pub DatasourceError);

impl From<DatasourceError> for ApiError {
    fn from(err: DatasourceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Internal error: {:?}", self.0);
        }

        let body = Json(json!({
            "error": self.0.message(),
            "code": self.0.error_code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = ApiError(DatasourceError::Validation("bad".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError(DatasourceError::Store {
            status: 404,
            message: "bucket 'x' not found".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(DatasourceError::Store {
            status: 1000,
            message: "weird".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
