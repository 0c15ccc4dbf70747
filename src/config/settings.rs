//! Store settings file parsing

use crate::config::defaults::{
    CANONICAL_FILE_NAME, DEFAULT_LOCK_TIMEOUT, DEFAULT_PERSIST_RETRIES,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings as written in `settings.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub path: Option<PathBuf>,
    pub lock_timeout_ms: Option<u64>,
    pub persist_retries: Option<u32>,
    pub refresh_from_disk: Option<bool>,
}

/// Resolved settings the store is opened with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Canonical configuration file
    pub path: PathBuf,

    /// Upper bound on waiting for the writer lock
    pub lock_timeout: Duration,

    /// Extra persistence attempts after the first failure
    pub persist_retries: u32,

    /// Re-read the canonical file when another process changed it
    pub refresh_from_disk: bool,
}

impl StoreSettings {
    /// Built-in settings around an explicit canonical path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            persist_retries: DEFAULT_PERSIST_RETRIES,
            refresh_from_disk: true,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_persist_retries(mut self, retries: u32) -> Self {
        self.persist_retries = retries;
        self
    }

    pub fn with_refresh_from_disk(mut self, enabled: bool) -> Self {
        self.refresh_from_disk = enabled;
        self
    }

    /// Layer a settings file over the built-ins. `fallback_path` is used
    /// when the file does not name a canonical path.
    pub fn from_file(file: SettingsFile, fallback_path: PathBuf) -> Self {
        let mut settings = Self::at(file.path.unwrap_or(fallback_path));
        if let Some(ms) = file.lock_timeout_ms {
            settings.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = file.persist_retries {
            settings.persist_retries = retries;
        }
        if let Some(refresh) = file.refresh_from_disk {
            settings.refresh_from_disk = refresh;
        }
        settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Default canonical path when neither settings nor environment name one.
pub fn default_canonical_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("callconf").join(CANONICAL_FILE_NAME),
        None => PathBuf::from(CANONICAL_FILE_NAME),
    }
}
