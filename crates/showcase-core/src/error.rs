//! Error types for the Showcase data layer.
//!
//! Every fallible operation in the crate returns [`ShowcaseError`]. Failures that
//! the data layer absorbs on purpose (refresh-path errors, stale cache reads,
//! dropped queue actions) are logged and never surface through these types.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Showcase data layer.
#[derive(Debug, Error)]
pub enum ShowcaseError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    /// Carries the configured request timeout when one was set.
    #[error("Request timed out{}", .0.map(|d| format!(" after {:?}", d)).unwrap_or_default())]
    Timeout(Option<std::time::Duration>),

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Rate limited by {service}, resets at {reset_at:?}")]
    RateLimited {
        service: String,
        /// Unix timestamp (seconds) when the quota resets, if reported.
        reset_at: Option<u64>,
    },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    // Credential errors
    #[error("Token issuance failed: {message}")]
    TokenIssuance { message: String },

    // Payload errors
    #[error("Malformed payload from {source_name}: {message}")]
    MalformedPayload {
        source_name: String,
        message: String,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Storage errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Validation errors
    #[error("Invalid repository identifier: {0}")]
    InvalidRepository(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Action queue has been shut down")]
    QueueClosed,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Showcase operations.
pub type Result<T> = std::result::Result<T, ShowcaseError>;

impl From<std::io::Error> for ShowcaseError {
    fn from(err: std::io::Error) -> Self {
        ShowcaseError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ShowcaseError {
    fn from(err: serde_json::Error) -> Self {
        ShowcaseError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for ShowcaseError {
    fn from(err: rusqlite::Error) -> Self {
        ShowcaseError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for ShowcaseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ShowcaseError::Timeout(None)
        } else {
            ShowcaseError::Network {
                message: err.to_string(),
                cause: std::error::Error::source(&err).map(|s| s.to_string()),
            }
        }
    }
}

impl From<url::ParseError> for ShowcaseError {
    fn from(err: url::ParseError) -> Self {
        ShowcaseError::InvalidUrl {
            url: String::new(),
            message: err.to_string(),
        }
    }
}

impl ShowcaseError {
    /// Create a malformed-payload error for a named origin.
    pub fn malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        ShowcaseError::MalformedPayload {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is transient (network-level, rate limiting or a
    /// server-side 5xx), i.e. the same call may succeed later.
    ///
    /// Callers use this to decide whether an error is worth retrying or
    /// surfacing as "try again later". Cache fallback does not depend on it:
    /// any failed refresh is served from an existing entry.
    pub fn is_transient(&self) -> bool {
        match self {
            ShowcaseError::Network { .. }
            | ShowcaseError::Timeout(_)
            | ShowcaseError::RateLimited { .. } => true,
            ShowcaseError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShowcaseError::Http {
            url: "https://example.com/api/x".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com/api/x");

        let err = ShowcaseError::malformed("github", "missing stargazers_count");
        assert_eq!(
            err.to_string(),
            "Malformed payload from github: missing stargazers_count"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(ShowcaseError::Timeout(Some(std::time::Duration::from_secs(5))).is_transient());
        assert!(ShowcaseError::RateLimited {
            service: "GitHub".into(),
            reset_at: None,
        }
        .is_transient());
        assert!(ShowcaseError::Network {
            message: "connection reset".into(),
            cause: None,
        }
        .is_transient());
        assert!(ShowcaseError::Http {
            url: "u".into(),
            status: 503
        }
        .is_transient());
        assert!(!ShowcaseError::Http {
            url: "u".into(),
            status: 404
        }
        .is_transient());
        assert!(!ShowcaseError::InvalidRepository("nope".into()).is_transient());
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(ShowcaseError::Timeout(None).to_string(), "Request timed out");
        assert_eq!(
            ShowcaseError::Timeout(Some(std::time::Duration::from_secs(5))).to_string(),
            "Request timed out after 5s"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let err: ShowcaseError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, ShowcaseError::Json { source: Some(_), .. }));
    }
}
