//! Configuration for draftsync.
//!
//! The [`Config`] struct names the remote resource, the local draft and where
//! the item store lives. It is persisted as TOML (typically at
//! `~/.config/draftsync/config.toml` on Unix systems).
//!
//! # Example
//!
//! ```ignore
//! use draftsync_core::config::Config;
//!
//! let config = Config::load()?;
//! let url = config.remote_url()?;
//! let interval = config.autosave_interval();
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::item::DEFAULT_MEDIA_TYPE;

const DEFAULT_DOCUMENT_KEY: &str = "draft";
const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 2000;

/// The parts of draftsync the user can configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// URL of the remote resource (GET/PUT with ETag support)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Key the draft is stored under in the item store
    #[serde(default = "default_document_key")]
    pub document_key: String,

    /// File holding the editable draft
    pub document_path: PathBuf,

    /// Directory of the local item store
    pub store_dir: PathBuf,

    /// Autosave debounce interval in milliseconds
    #[serde(default = "default_autosave_interval_ms")]
    pub autosave_interval_ms: u64,

    /// Whether autosave also reconciles with the remote
    #[serde(default = "default_true")]
    pub remote_autosave: bool,

    /// Media type sent with pushed content
    #[serde(default = "default_media_type")]
    pub media_type: String,

    /// Bearer token for the remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

fn default_document_key() -> String {
    DEFAULT_DOCUMENT_KEY.to_string()
}

fn default_autosave_interval_ms() -> u64 {
    DEFAULT_AUTOSAVE_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_media_type() -> String {
    DEFAULT_MEDIA_TYPE.to_string()
}

impl Config {
    /// Create a config for the draft at `document_path`, storing items in `store_dir`.
    pub fn new(document_path: PathBuf, store_dir: PathBuf) -> Self {
        Self {
            remote_url: None,
            document_key: default_document_key(),
            document_path,
            store_dir,
            autosave_interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
            remote_autosave: true,
            media_type: default_media_type(),
            session_token: None,
        }
    }

    /// The configured remote URL.
    pub fn remote_url(&self) -> Result<&str> {
        self.remote_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SyncError::RemoteNotConfigured)
    }

    /// Autosave debounce interval.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SyncError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

// ============================================================================
// Native-only implementation (not available in WASM)
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data = dirs::data_dir().unwrap_or_else(|| home.join(".local").join("share"));
        Self::new(
            home.join("draftsync").join("draft.html"),
            data.join("draftsync").join("store"),
        )
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Config {
    /// Get the config file path (~/.config/draftsync/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("draftsync").join("config.toml"))
    }

    /// Load config from default location, or return default if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }

        Ok(Config::default())
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(SyncError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Apply user-provided values to the existing (or default) config and save it
    pub fn init(remote_url: Option<String>, document_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load()?;
        if remote_url.is_some() {
            config.remote_url = remote_url;
        }
        if let Some(path) = document_path {
            config.document_path = path;
        }

        config.save()?;
        Ok(config)
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for Config {
    fn default() -> Self {
        Self::new(PathBuf::from("/draft.html"), PathBuf::from("/store"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::new(dir.path().join("draft.html"), dir.path().join("store"));
        config.remote_url = Some("https://pod.example/notes/draft".to_string());
        config.session_token = Some("secret".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "document_path = \"/tmp/draft.html\"\nstore_dir = \"/tmp/store\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.document_key, "draft");
        assert_eq!(config.autosave_interval(), Duration::from_millis(2000));
        assert!(config.remote_autosave);
        assert_eq!(config.media_type, "text/html");
        assert!(matches!(
            config.remote_url(),
            Err(SyncError::RemoteNotConfigured)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/draftsync.toml")).unwrap_err();
        assert!(matches!(err, SyncError::FileRead { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "document_path = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(SyncError::ConfigParse(_))
        ));
    }
}
