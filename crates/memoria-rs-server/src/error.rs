//! Error types for the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use memoria_rs_memory::MemoryError;
use serde::Serialize;

/// Failures starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The bind address did not parse.
    #[error("invalid bind address {0}")]
    InvalidBind(String),
    /// Binding or serving failed.
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error body returned by every failing route.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
}

/// Error response with a stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: message.into(),
        }
    }

    pub fn bad_request(error_code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_code, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error_code(&self) -> &str {
        self.error_code
    }
}

impl From<MemoryError> for ApiError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Validation(message) => Self::bad_request("validation_error", message),
            MemoryError::InvalidArgument(message) => Self::bad_request("invalid_argument", message),
            MemoryError::StorageUnavailable(message) => {
                warn!("storage unavailable: {message}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage_unavailable",
                    message,
                )
            }
            MemoryError::Serde(err) => {
                error!("serialization failed: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    err.to_string(),
                )
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("store task failed: {err}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "store task failed",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use memoria_rs_memory::MemoryError;
    use pretty_assertions::assert_eq;

    #[test]
    fn maps_memory_errors_to_status_codes() {
        let cases = [
            (
                MemoryError::Validation("x".to_string()),
                StatusCode::BAD_REQUEST,
                "validation_error",
            ),
            (
                MemoryError::InvalidArgument("x".to_string()),
                StatusCode::BAD_REQUEST,
                "invalid_argument",
            ),
            (
                MemoryError::StorageUnavailable("x".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
                "storage_unavailable",
            ),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.error_code(), code);
        }
    }
}
