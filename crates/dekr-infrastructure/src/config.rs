//! Client configuration loaded from `~/.config/dekr/config.toml`.
//!
//! Every field has a default, so a missing or empty file is valid. The
//! `DEKR_BASE_URL` environment variable overrides `base_url`.

use dekr_core::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::paths::DekrPaths;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const BASE_URL_ENV: &str = "DEKR_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the assistant server, without the `/api/v1` prefix.
    pub base_url: String,
    /// Per-request timeout; `0` disables it.
    pub request_timeout_secs: u64,
    /// Delay before a typed draft is persisted.
    pub draft_debounce_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
            draft_debounce_ms: 500,
        }
    }
}

impl ClientConfig {
    /// Loads the default config file, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = DekrPaths::config_file()?;
        let mut config = Self::load_from(&path)?;
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        Ok(config)
    }

    /// Loads a config file. Missing and empty files yield the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(toml::from_str(&content)?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.draft_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"https://chat.dekr.co\"").unwrap();
        writeln!(file, "request_timeout_secs = 0").unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.base_url, "https://chat.dekr.co");
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.draft_debounce_ms, 500);
    }

    #[test]
    fn test_invalid_file_is_a_serialization_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "base_url = [").unwrap();

        let err = ClientConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, dekr_core::DekrError::Serialization { .. }));
    }
}
