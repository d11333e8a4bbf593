//! Error types for the Dekr chat client.
//!
//! Three layers are kept apart:
//!
//! - [`DekrError`]: local failures (file system, configuration, serialization).
//! - [`ApiError`]: what the transport reported for a remote call.
//! - [`ChatError`]: the user-facing classification of a failed exchange.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback text when a failure carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing your message.";

/// Default text for HTTP 429 responses without a server-provided message.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Fixed text for HTTP 401 responses.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please refresh the page.";

/// A shared error type for local (non-network) operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum DekrError {
    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DekrError {
    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for DekrError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DekrError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DekrError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for DekrError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, DekrError>`.
pub type Result<T> = std::result::Result<T, DekrError>;

/// A failure reported by the transport for one remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-success HTTP status.
    ///
    /// `error` is the `error` field of the JSON body, when the body had one.
    #[error("HTTP {status}{}", .error.as_deref().map(|e| format!(": {e}")).unwrap_or_default())]
    Status { status: u16, error: Option<String> },

    /// No usable response at all (connect failure, timeout, unreadable body).
    #[error("{}", .message.as_deref().unwrap_or("network failure"))]
    Network { message: Option<String> },
}

impl ApiError {
    pub fn status(status: u16, error: Option<String>) -> Self {
        Self::Status { status, error }
    }

    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Network {
            message: (!message.trim().is_empty()).then_some(message),
        }
    }
}

/// Classified reason a chat exchange failed, as presented to the user.
///
/// `Display` yields exactly the text shown in the alert and embedded in the
/// synthetic assistant entry.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatError {
    /// Quota or request-rate exhaustion (HTTP 429).
    #[error("{message}")]
    RateLimited { message: String },

    /// The server no longer recognises the session (HTTP 401). Not retried.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    Unauthenticated,

    /// The server processed the request but reported an application error.
    #[error("{message}")]
    Application { message: String },

    /// The request never produced a usable response.
    #[error("{message}")]
    Transport { message: String },
}

impl ChatError {
    /// Maps a transport failure to its user-facing classification.
    ///
    /// Pure: the same `ApiError` always yields the same `ChatError`.
    pub fn classify(err: &ApiError) -> Self {
        match err {
            ApiError::Status { status: 429, error } => Self::RateLimited {
                message: non_blank(error.as_deref()).unwrap_or(RATE_LIMIT_MESSAGE).to_string(),
            },
            ApiError::Status { status: 401, .. } => Self::Unauthenticated,
            ApiError::Status { error, .. } => match non_blank(error.as_deref()) {
                Some(message) => Self::Application {
                    message: message.to_string(),
                },
                None => Self::Transport {
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                },
            },
            ApiError::Network { message } => Self::Transport {
                message: non_blank(message.as_deref())
                    .unwrap_or(GENERIC_FAILURE_MESSAGE)
                    .to_string(),
            },
        }
    }

    /// An application-level error carried by an otherwise successful response.
    pub fn application(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self::Application {
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            };
        }
        Self::Application { message }
    }

    /// Whether retrying the same request could succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unauthenticated)
    }

    /// Text of the synthetic assistant entry recorded for this failure.
    pub fn apology(&self) -> String {
        format!("I'm sorry, but I encountered an error: {self}. Please try again.")
    }
}

impl From<ApiError> for ChatError {
    fn from(err: ApiError) -> Self {
        Self::classify(&err)
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_uses_server_message() {
        let err = ApiError::status(429, Some("Too many requests".into()));
        let classified = ChatError::classify(&err);
        assert_eq!(
            classified,
            ChatError::RateLimited {
                message: "Too many requests".into()
            }
        );
        assert_eq!(classified.to_string(), "Too many requests");
    }

    #[test]
    fn test_rate_limit_default_message() {
        let classified = ChatError::classify(&ApiError::status(429, None));
        assert_eq!(classified.to_string(), RATE_LIMIT_MESSAGE);

        let blank = ChatError::classify(&ApiError::status(429, Some("  ".into())));
        assert_eq!(blank.to_string(), RATE_LIMIT_MESSAGE);
    }

    #[test]
    fn test_unauthenticated_ignores_body() {
        let classified = ChatError::classify(&ApiError::status(401, Some("nope".into())));
        assert_eq!(classified, ChatError::Unauthenticated);
        assert_eq!(classified.to_string(), SESSION_EXPIRED_MESSAGE);
        assert!(!classified.is_recoverable());
    }

    #[test]
    fn test_other_status_with_body_is_application_error() {
        let classified = ChatError::classify(&ApiError::status(
            500,
            Some("An error occurred while processing your message".into()),
        ));
        assert!(matches!(classified, ChatError::Application { .. }));
        assert!(classified.is_recoverable());
    }

    #[test]
    fn test_other_status_without_body_is_transport_error() {
        let classified = ChatError::classify(&ApiError::status(502, None));
        assert_eq!(
            classified,
            ChatError::Transport {
                message: GENERIC_FAILURE_MESSAGE.into()
            }
        );
    }

    #[test]
    fn test_network_error_text_is_surfaced() {
        let classified = ChatError::classify(&ApiError::network("connection refused"));
        assert_eq!(classified.to_string(), "connection refused");

        let empty = ChatError::classify(&ApiError::network(""));
        assert_eq!(empty.to_string(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let failures = [
            ApiError::status(429, Some("slow down".into())),
            ApiError::status(401, None),
            ApiError::status(400, Some("Message is required".into())),
            ApiError::network("timed out"),
        ];
        for failure in &failures {
            assert_eq!(ChatError::classify(failure), ChatError::classify(failure));
        }
    }

    #[test]
    fn test_apology_embeds_message() {
        let err = ChatError::application("Invalid input");
        assert_eq!(
            err.apology(),
            "I'm sorry, but I encountered an error: Invalid input. Please try again."
        );
    }

    #[test]
    fn test_local_error_messages() {
        assert_eq!(
            DekrError::config("no config dir").to_string(),
            "Configuration error: no config dir"
        );
        assert_eq!(DekrError::io("disk full").to_string(), "IO error: disk full");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DekrError = io.into();
        assert!(matches!(err, DekrError::Io { .. }));
        assert!(err.to_string().contains("missing"));
    }
}
