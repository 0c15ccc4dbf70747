//! Settings loader with layered precedence
//!
//! Priority order (highest to lowest):
//! 1. Explicit settings file passed by the caller
//! 2. Project settings (./.callconf.toml)
//! 3. $CALLCONF_SETTINGS
//! 4. User settings (~/.config/callconf/settings.toml)
//! 5. Built-in defaults
//!
//! The canonical path comes from the settings file, then $CALLCONF_PATH,
//! then the platform data directory.

use crate::config::settings::{default_canonical_path, SettingsFile, StoreSettings};
use crate::types::{Result, StoreError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SETTINGS_ENV: &str = "CALLCONF_SETTINGS";
pub const PATH_ENV: &str = "CALLCONF_PATH";

pub struct SettingsLoader {
    candidates: Vec<PathBuf>,
    env_path: Option<PathBuf>,
}

impl SettingsLoader {
    /// Loader over the standard locations and environment.
    pub fn new() -> Self {
        let mut candidates = Vec::new();

        // Project-specific settings
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(".callconf.toml"));
        }

        // Environment variable
        if let Ok(settings_path) = std::env::var(SETTINGS_ENV) {
            candidates.push(PathBuf::from(settings_path));
        }

        // User-global settings
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("callconf").join("settings.toml"));
        }

        let env_path = std::env::var_os(PATH_ENV).map(PathBuf::from);

        Self {
            candidates,
            env_path,
        }
    }

    /// Loader with explicit candidates and no environment lookups.
    pub fn with_candidates(candidates: Vec<PathBuf>, env_path: Option<PathBuf>) -> Self {
        Self {
            candidates,
            env_path,
        }
    }

    /// Put an explicit settings file ahead of every other candidate.
    pub fn prefer(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates.insert(0, path.into());
        self
    }

    pub fn load(&self) -> Result<StoreSettings> {
        let fallback_path = self.env_path.clone().unwrap_or_else(default_canonical_path);

        for path in &self.candidates {
            if path.exists() {
                let file = Self::read_settings(path)?;
                info!("Loaded store settings from {}", path.display());
                return Ok(StoreSettings::from_file(file, fallback_path));
            }
        }

        debug!("No settings file found, using built-in defaults");
        Ok(StoreSettings::at(fallback_path))
    }

    fn read_settings(path: &Path) -> Result<SettingsFile> {
        debug!("Loading settings from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Settings(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            StoreError::Settings(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_no_candidates_uses_env_path() {
        let loader =
            SettingsLoader::with_candidates(vec![], Some(PathBuf::from("/run/callconf.json")));
        let settings = loader.load().unwrap();
        assert_eq!(settings.path, PathBuf::from("/run/callconf.json"));
        assert!(settings.refresh_from_disk);
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project.toml");
        let user = dir.path().join("user.toml");
        std::fs::write(&project, "lock_timeout_ms = 10\n").unwrap();
        std::fs::write(&user, "lock_timeout_ms = 99\n").unwrap();

        let loader = SettingsLoader::with_candidates(
            vec![dir.path().join("missing.toml"), project, user],
            Some(dir.path().join("config.json")),
        );
        let settings = loader.load().unwrap();
        assert_eq!(settings.lock_timeout, Duration::from_millis(10));
        assert_eq!(settings.path, dir.path().join("config.json"));
    }

    #[test]
    fn test_prefer_explicit_file() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let other = dir.path().join("other.toml");
        std::fs::write(&explicit, "persist_retries = 4\n").unwrap();
        std::fs::write(&other, "persist_retries = 0\n").unwrap();

        let loader = SettingsLoader::with_candidates(vec![other], None).prefer(&explicit);
        assert_eq!(loader.load().unwrap().persist_retries, 4);
    }

    #[test]
    fn test_invalid_settings_is_error() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "lock_timeout_ms = \"soon\"\n").unwrap();

        let loader = SettingsLoader::with_candidates(vec![bad], None);
        assert!(matches!(loader.load(), Err(StoreError::Settings(_))));
    }
}
