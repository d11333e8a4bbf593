//! Unified path management for dekr configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/dekr/              # Config directory (platform config dir)
//! ├── config.toml              # Client configuration
//! └── draft.toml               # Last unsent message
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform configuration directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find configuration directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for dekr_core::DekrError {
    fn from(err: PathError) -> Self {
        dekr_core::DekrError::config(err.to_string())
    }
}

/// Unified path management for dekr.
pub struct DekrPaths;

impl DekrPaths {
    const APP_DIR: &'static str = "dekr";

    /// Returns the dekr configuration directory (e.g. `~/.config/dekr/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the persisted draft.
    pub fn draft_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("draft.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_in_config_dir() {
        // Headless CI machines may not have a config dir at all.
        let Ok(dir) = DekrPaths::config_dir() else {
            return;
        };
        assert!(dir.ends_with("dekr"));
        assert_eq!(DekrPaths::config_file().unwrap(), dir.join("config.toml"));
        assert_eq!(DekrPaths::draft_file().unwrap(), dir.join("draft.toml"));
    }
}
