use serde::{Deserialize, Serialize};

/// Error body returned by the chat backend: `{"error": "...", "details": ...}`.
/// Only `error` is guaranteed; everything else is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendError {
    /// Human-readable description shown to the user verbatim
    pub error: String,
    /// Extra diagnostic payload (present on some history failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Messages rendered when the backend gives us nothing better.
pub mod messages {
    pub const CONNECTION_FAILED: &str = "Error: Could not connect to the server. Please try again.";
    pub const UNKNOWN_SERVER_ERROR: &str = "Unknown error from server.";
    pub const NO_REPLY: &str = "Error: Could not get a response.";
    pub const NO_ACTIVE_SESSION: &str =
        "Error: No active session. Please start a new chat or select a persona.";
}

impl BackendError {
    /// Parse an error body, falling back to a generic message when the body
    /// is missing or not the expected shape.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str::<BackendError>(body)
            .ok()
            .filter(|parsed| !parsed.error.trim().is_empty())
            .unwrap_or_else(|| BackendError {
                error: messages::UNKNOWN_SERVER_ERROR.to_string(),
                details: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_error_body() {
        let parsed = BackendError::from_body(r#"{"error":"Session not found","details":"x"}"#);
        assert_eq!(parsed.error, "Session not found");
        assert_eq!(parsed.details, Some(serde_json::json!("x")));
    }

    #[test]
    fn falls_back_for_non_json_or_blank_error() {
        assert_eq!(
            BackendError::from_body("<html>502</html>").error,
            messages::UNKNOWN_SERVER_ERROR
        );
        assert_eq!(
            BackendError::from_body(r#"{"error":"  "}"#).error,
            messages::UNKNOWN_SERVER_ERROR
        );
    }
}
