//! Error types for the slackbot-server application.
//!
//! Defines [`ServerError`] as the primary error type for all operations
//! within `slackbot-server`. Uses `thiserror` for ergonomic error definitions
//! following the project convention.

use thiserror::Error;

/// Error type for slackbot-server operations.
///
/// Variants are grouped by subsystem: configuration, Slack API transport,
/// WebSocket transport, envelope dispatch, listener failures and JSON
/// serialization.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// A configuration error (missing or malformed credentials, bad file).
    #[error(transparent)]
    Config(#[from] slackbot_core::ConfigError),

    /// An error from a Slack Web API call.
    #[error("Slack API error: {0}")]
    SlackApi(String),

    /// A WebSocket transport error (connection, read, write).
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An error while dispatching or routing an envelope.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// A registered listener failed or panicked.
    #[error("Handler error: {0}")]
    Handler(String),

    /// A Socket Mode frame that is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_display_slack_api_error() {
        let err = ServerError::SlackApi("invalid_auth".into());
        assert_eq!(err.to_string(), "Slack API error: invalid_auth");
    }

    #[test]
    fn test_should_display_websocket_error() {
        let err = ServerError::WebSocket("connection refused".into());
        assert_eq!(err.to_string(), "WebSocket error: connection refused");
    }

    #[test]
    fn test_should_display_handler_error() {
        let err = ServerError::Handler("listener panicked".into());
        assert_eq!(err.to_string(), "Handler error: listener panicked");
    }

    #[test]
    fn test_should_convert_from_config_error() {
        let cfg_err = slackbot_core::ConfigError::MissingSetting("slack.app_token");
        let err: ServerError = cfg_err.into();
        assert!(matches!(err, ServerError::Config(_)));
        assert_eq!(err.to_string(), "Missing required setting: slack.app_token");
    }

    #[test]
    fn test_should_convert_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ServerError = json_err.into();
        assert!(matches!(err, ServerError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: expected value"));
    }
}
