//! Centralized configuration for the Showcase data layer.
//!
//! Constants live on unit structs grouped by concern. [`ClientOptions`] carries
//! the subset that callers override at runtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const USER_AGENT: &'static str = "Showcase/0.1";
    pub const TOKEN_PATH: &'static str = "/auth/token";
    pub const CREDENTIAL_HEADER: &'static str = "X-CSRF-Token";
    pub const GITHUB_API_BASE: &'static str = "https://api.github.com";
    pub const GITHUB_ACCEPT: &'static str = "application/vnd.github.v3+json";
}

/// Cache configuration.
pub struct CacheConfig;

impl CacheConfig {
    pub const REPO_INFO_TTL: Duration = Duration::from_secs(3600);
    pub const REPO_INFO_NAMESPACE: &'static str = "github_repo";
    pub const MEMORY_CAPACITY: u64 = 256;
    pub const TIMESTAMP_SUFFIX: &'static str = "_ts";
}

/// Action queue configuration.
pub struct QueueConfig;

impl QueueConfig {
    pub const SETTLE_DELAY: Duration = Duration::from_millis(300);
}

/// Auto-scroll configuration.
pub struct ScrollConfig;

impl ScrollConfig {
    /// Pixels advanced per elapsed millisecond.
    pub const SPEED_PX_PER_MS: f64 = 0.05;
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
}

/// Local storage configuration.
pub struct StorageConfig;

impl StorageConfig {
    pub const CREDENTIAL_KEY: &'static str = "auth_token";
    pub const DATABASE_FILE_NAME: &'static str = "showcase-storage.sqlite3";
    pub const APP_DIR_NAME: &'static str = "showcase";
}

/// Runtime options for the backend client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClientOptions {
    /// Backend origin, e.g. `https://gallery.example.com`.
    pub origin: String,
    /// Path of the token-issuance endpoint, relative to `origin`.
    pub token_path: String,
    /// Header the credential is attached under.
    pub credential_header: String,
    /// Base URL of the third-party repository metadata API.
    pub metadata_origin: String,
    /// Overall per-request timeout. `None` leaves requests unbounded.
    #[serde(with = "duration_secs")]
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            token_path: NetworkConfig::TOKEN_PATH.to_string(),
            credential_header: NetworkConfig::CREDENTIAL_HEADER.to_string(),
            metadata_origin: NetworkConfig::GITHUB_API_BASE.to_string(),
            request_timeout: None,
            user_agent: NetworkConfig::USER_AGENT.to_string(),
        }
    }
}

impl ClientOptions {
    /// Options pointing at the given backend origin, defaults elsewhere.
    pub fn for_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_options_defaults_fill_missing_fields() {
        let options: ClientOptions =
            serde_json::from_str(r#"{"origin": "https://gallery.test", "request_timeout": 5}"#)
                .unwrap();
        assert_eq!(options.origin, "https://gallery.test");
        assert_eq!(options.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.token_path, "/auth/token");
        assert_eq!(options.credential_header, "X-CSRF-Token");
    }

    #[test]
    fn test_no_request_timeout_by_default() {
        assert_eq!(ClientOptions::default().request_timeout, None);

        let options: ClientOptions =
            serde_json::from_str(r#"{"origin": "https://gallery.test"}"#).unwrap();
        assert_eq!(options.request_timeout, None);

        let options: ClientOptions =
            serde_json::from_str(r#"{"request_timeout": null}"#).unwrap();
        assert_eq!(options.request_timeout, None);
    }

    #[test]
    fn test_for_origin() {
        let options = ClientOptions::for_origin("https://a.test");
        assert_eq!(options.origin, "https://a.test");
        assert_eq!(options.metadata_origin, NetworkConfig::GITHUB_API_BASE);
    }
}
