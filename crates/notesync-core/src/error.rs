//! Error types for notesync.

use thiserror::Error;

/// Result type alias using notesync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notesync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP/network request failed, or the server answered with a non-2xx status
    #[error("Request error: {0}")]
    Request(String),

    /// The table service answered with a non-zero envelope code.
    ///
    /// `message` is the already-translated, user-facing text.
    #[error("{message}")]
    Api { code: i64, message: String },

    /// Caller-supplied configuration is unusable (missing credentials, bad URL)
    #[error("{0}")]
    Validation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation ran past its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Envelope code for protocol errors, `None` for everything else.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Error::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_request() {
        let err = Error::Request("network unreachable".to_string());
        assert_eq!(err.to_string(), "Request error: network unreachable");
    }

    #[test]
    fn test_error_display_api_is_translated_message() {
        let err = Error::Api {
            code: 1254040,
            message: "app_token不存在".to_string(),
        };
        assert_eq!(err.to_string(), "app_token不存在");
        assert_eq!(err.api_code(), Some(1254040));
    }

    #[test]
    fn test_error_display_validation_is_verbatim() {
        let err = Error::Validation("请先填写表格链接".to_string());
        assert_eq!(err.to_string(), "请先填写表格链接");
        assert_eq!(err.api_code(), None);
    }

    #[test]
    fn test_error_display_timeout() {
        let err = Error::Timeout("sync deadline".to_string());
        assert_eq!(err.to_string(), "Timed out: sync deadline");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
