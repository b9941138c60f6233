//! Error types for the data source

use reduct_client::ClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasourceError>;

#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Error reported by the store, status and message kept as is
    #[error("Store error ({status}): {message}")]
    Store { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DatasourceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Store { status, .. } => *status,
            Self::Unavailable(_) => 503,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Store { .. } => "STORE_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message without the variant prefix, as shown to the host
    pub fn message(&self) -> String {
        match self {
            Self::Config(m)
            | Self::Validation(m)
            | Self::NotFound(m)
            | Self::Network(m)
            | Self::Unavailable(m)
            | Self::Internal(m) => m.clone(),
            Self::Store { message, .. } => message.clone(),
        }
    }
}

impl From<ClientError> for DatasourceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, message } => DatasourceError::Store { status, message },
            ClientError::Http(e) => match e.status() {
                Some(status) => DatasourceError::Store {
                    status: status.as_u16(),
                    message: e.to_string(),
                },
                None => DatasourceError::Network(e.to_string()),
            },
            ClientError::Protocol(m) => DatasourceError::Network(m),
            ClientError::Serialization(e) => DatasourceError::Internal(e.to_string()),
            ClientError::Configuration(m) => DatasourceError::Config(m),
        }
    }
}

impl From<std::io::Error> for DatasourceError {
    fn from(err: std::io::Error) -> Self {
        DatasourceError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_status() {
        let err = DatasourceError::from(ClientError::not_found("bucket 'x' not found"));
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "STORE_ERROR");
        assert_eq!(err.message(), "bucket 'x' not found");
    }

    #[test]
    fn test_client_errors_without_status() {
        let err = DatasourceError::from(ClientError::Protocol("connection reset".to_string()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "NETWORK_ERROR");

        let err = DatasourceError::from(ClientError::Configuration("server URL is empty".to_string()));
        assert!(matches!(err, DatasourceError::Config(_)));
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err = DatasourceError::Validation("missing bucket or entry".to_string());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Validation error: missing bucket or entry");
        assert_eq!(err.message(), "missing bucket or entry");
    }
}
