//! Error types used throughout the relay

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for PO-Relay
///
/// Every variant maps onto one of the four terminal failure categories
/// (validation, auth, api, network) that drive archive routing and the
/// process exit code; see [`crate::types::RunOutcome::from_error`].
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Private key error: {0}")]
    KeyLoad(String),

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Malformed input document: {0}")]
    MalformedInput(String),

    #[error("Authentication rejected (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    #[error("Remote API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_detail() {
        let err = RelayError::KeyLoad("no such file".to_string());
        assert!(err.to_string().contains("no such file"));

        let err = RelayError::Auth { status: 401, detail: "token expired".to_string() };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("token expired"));
    }

    #[test]
    fn error_serializes_with_type_tag() {
        let err = RelayError::Network("connection refused".to_string());
        let json = serde_json::to_string(&err).expect("serialize");
        assert!(json.contains("\"Network\""));
        assert!(json.contains("connection refused"));
    }
}
