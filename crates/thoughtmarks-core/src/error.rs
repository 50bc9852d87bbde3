//! Error types for Thoughtmarks.

use thiserror::Error;

/// Result type alias using Thoughtmarks' Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Thoughtmarks operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(i32),

    /// Bin not found
    #[error("Bin not found: {0}")]
    BinNotFound(i32),

    /// Thoughtmark not found
    #[error("Thoughtmark not found: {0}")]
    ThoughtmarkNotFound(i32),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Categorization/insight suggestion call failed
    #[error("Suggestion error: {0}")]
    Suggestion(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_user_not_found() {
        let err = Error::UserNotFound(42);
        assert_eq!(err.to_string(), "User not found: 42");
    }

    #[test]
    fn test_error_display_bin_not_found() {
        let err = Error::BinNotFound(7);
        assert_eq!(err.to_string(), "Bin not found: 7");
    }

    #[test]
    fn test_error_display_thoughtmark_not_found() {
        let err = Error::ThoughtmarkNotFound(13);
        assert_eq!(err.to_string(), "Thoughtmark not found: 13");
    }

    #[test]
    fn test_error_display_embedding() {
        let err = Error::Embedding("provider returned 429".to_string());
        assert_eq!(err.to_string(), "Embedding error: provider returned 429");
    }

    #[test]
    fn test_error_display_suggestion() {
        let err = Error::Suggestion("model timeout".to_string());
        assert_eq!(err.to_string(), "Suggestion error: model timeout");
    }

    #[test]
    fn test_error_display_serialization() {
        let err = Error::Serialization("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Serialization error: invalid JSON");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing API key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("limit must be >= 1".to_string());
        assert_eq!(err.to_string(), "Invalid input: limit must be >= 1");
    }

    #[test]
    fn test_error_display_request() {
        let err = Error::Request("network unreachable".to_string());
        assert_eq!(err.to_string(), "Request error: network unreachable");
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("unexpected state".to_string());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_serde_json_error_maintains_message() {
        let json_str = r#"{"invalid": json}"#;
        let json_err = serde_json::from_str::<serde_json::Value>(json_str);
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        let result = get_result();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::Internal("test".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::BinNotFound(1);
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("BinNotFound"));
    }
}
