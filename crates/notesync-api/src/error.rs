//! Bridge error responses.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Failures the bridge reports as HTTP errors.
///
/// Orchestration failures are not errors here: they travel inside a
/// `{success: false, error}` body with status 200.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<notesync_core::Error> for ApiError {
    fn from(err: notesync_core::Error) -> Self {
        match err {
            notesync_core::Error::InvalidInput(msg) | notesync_core::Error::Validation(msg) => {
                ApiError::BadRequest(msg)
            }
            notesync_core::Error::Serialization(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid message: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(subsystem = "api", error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = notesync_core::Error::Validation("请先填写表格链接".into()).into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "请先填写表格链接"));
    }

    #[test]
    fn test_io_maps_to_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ApiError = notesync_core::Error::from(io).into();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
