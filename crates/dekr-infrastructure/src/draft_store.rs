//! File-backed [`DraftStore`].
//!
//! The draft lives in a small TOML file that is replaced atomically on every
//! save (tmp file + fsync + rename), so a crash mid-write leaves either the
//! old draft or the new one, never a torn file.

use chrono::{DateTime, Utc};
use dekr_core::draft::DraftStore;
use dekr_core::error::{DekrError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use crate::paths::DekrPaths;

#[derive(Debug, Serialize, Deserialize)]
struct DraftFile {
    text: String,
    saved_at: DateTime<Utc>,
}

/// Stores the draft at a fixed path.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    /// Uses the default location, `~/.config/dekr/draft.toml`.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(DekrPaths::draft_file()?))
    }

    /// Uses a custom file path (tests, portable installs).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| DekrError::io(format!("Draft path has no file name: {:?}", self.path)))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let draft: DraftFile = toml::from_str(&content)?;
        Ok((!draft.text.is_empty()).then_some(draft.text))
    }

    fn save(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(&DraftFile {
            text: text.to_string(),
            saved_at: Utc::now(),
        })?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!(chars = text.chars().count(), "draft saved to {:?}", self.path);
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileDraftStore {
        FileDraftStore::with_path(dir.path().join("nested").join("draft.toml"))
    }

    #[test]
    fn test_load_missing_draft() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).load().unwrap(), None);
    }

    #[test]
    fn test_save_load_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save("What is a \"stock\"?\nline two").unwrap();
        assert_eq!(
            store.load().unwrap().as_deref(),
            Some("What is a \"stock\"?\nline two")
        );

        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));
        assert!(!store.temp_path().unwrap().exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save("draft").unwrap();
        store.remove().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.remove().unwrap();
    }

    #[test]
    fn test_empty_draft_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save("").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
