//! Durable storage for configuration snapshots
//!
//! The canonical file is only ever replaced by rename, so a reader of the
//! canonical path sees either the previous document or the complete new
//! one.

use crate::config::ConfigSnapshot;
use crate::types::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::debug;

/// Identity of one version of the canonical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
    inode: u64,
}

impl Fingerprint {
    fn of(metadata: &fs::Metadata) -> Self {
        #[cfg(unix)]
        let inode = {
            use std::os::unix::fs::MetadataExt;
            metadata.ino()
        };
        #[cfg(not(unix))]
        let inode = 0;

        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
            inode,
        }
    }
}

/// Why no snapshot could be read.
#[derive(Debug, Clone, PartialEq)]
pub enum NotFound {
    Missing,
    Unreadable(String),
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Found {
        snapshot: ConfigSnapshot,
        fingerprint: Option<Fingerprint>,
    },
    NotFound(NotFound),
}

/// Storage backend behind the configuration store.
pub trait Persistence: Send + Sync {
    /// Replace the stored snapshot. Returns the fingerprint of the new
    /// version when the backend can observe it.
    fn save(&self, snapshot: &ConfigSnapshot) -> Result<Option<Fingerprint>>;

    /// Read the stored snapshot. Never fatal.
    fn load(&self) -> LoadOutcome;

    /// Cheap identity check of the stored version; `None` if absent.
    fn fingerprint(&self) -> Option<Fingerprint>;

    fn location(&self) -> &Path;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// JSON document at a fixed path.
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sibling of the canonical file, unique per process and per write.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "config.json".into());
        name.push(format!(
            ".{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        self.path.with_file_name(name)
    }
}

impl Persistence for FilePersistence {
    fn save(&self, snapshot: &ConfigSnapshot) -> Result<Option<Fingerprint>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut bytes = serde_json::to_vec_pretty(snapshot)?;
        bytes.push(b'\n');

        let temp_path = self.temp_path();
        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });

        if let Err(e) = written.and_then(|_| fs::rename(&temp_path, &self.path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(self.fingerprint())
    }

    fn load(&self) -> LoadOutcome {
        // Stat before reading: a concurrent replace then shows up as a
        // changed fingerprint on the next check.
        let fingerprint = self.fingerprint();

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LoadOutcome::NotFound(NotFound::Missing);
            }
            Err(e) => return LoadOutcome::NotFound(NotFound::Unreadable(e.to_string())),
        };

        match serde_json::from_str::<ConfigSnapshot>(&content) {
            Ok(snapshot) => LoadOutcome::Found {
                snapshot,
                fingerprint,
            },
            Err(e) => LoadOutcome::NotFound(NotFound::Corrupt(e.to_string())),
        }
    }

    fn fingerprint(&self) -> Option<Fingerprint> {
        fs::metadata(&self.path).ok().map(|m| Fingerprint::of(&m))
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_snapshot, UpdateRequest};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let persistence = FilePersistence::new(dir.path().join("config.json"));
        assert_eq!(persistence.load(), LoadOutcome::NotFound(NotFound::Missing));
        assert!(persistence.fingerprint().is_none());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let persistence = FilePersistence::new(&path);
        assert!(matches!(
            persistence.load(),
            LoadOutcome::NotFound(NotFound::Corrupt(_))
        ));
    }

    #[test]
    fn test_save_then_load_is_equal() {
        let dir = TempDir::new().unwrap();
        let persistence = FilePersistence::new(dir.path().join("nested").join("config.json"));

        let snapshot = default_snapshot().merged(
            &UpdateRequest::new()
                .caller_name("Alice")
                .extension("room_prefix", json!("agent-room")),
        );
        let fingerprint = persistence.save(&snapshot).unwrap();
        assert!(fingerprint.is_some());

        match persistence.load() {
            LoadOutcome::Found {
                snapshot: loaded,
                fingerprint: seen,
            } => {
                assert_eq!(loaded, snapshot);
                assert_eq!(seen, fingerprint);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let persistence = FilePersistence::new(dir.path().join("config.json"));
        persistence.save(&default_snapshot()).unwrap();
        persistence.save(&default_snapshot()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.json")]);
    }

    #[test]
    fn test_replace_changes_fingerprint() {
        let dir = TempDir::new().unwrap();
        let persistence = FilePersistence::new(dir.path().join("config.json"));

        let first = persistence.save(&default_snapshot()).unwrap();
        let second = persistence
            .save(&default_snapshot().merged(&UpdateRequest::new().caller_name("Bob")))
            .unwrap();
        assert_ne!(first, second);
    }
}
