//! Blocking configuration store
//!
//! Writers are linearized through one timed mutex guarding merge and swap.
//! Readers load the current snapshot through `ArcSwap` without locking, so
//! they see either the snapshot before a swap or the one after it.
//!
//! Persistence runs after the writer lock is released, serialized by a
//! second mutex, and always writes the newest swapped snapshot. The file
//! therefore never moves back to an older snapshot.

use crate::config::{default_snapshot, ConfigSnapshot, StoreSettings, UpdateRequest};
use crate::session::Session;
use crate::store::persistence::{FilePersistence, Fingerprint, LoadOutcome, NotFound, Persistence};
use crate::store::AsyncConfigStore;
use crate::types::{Result, StoreError};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the current snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Produced by this process; must reach disk
    Local,
    /// Read from the canonical file; already on disk
    Disk,
}

#[derive(Debug)]
struct Versioned {
    generation: u64,
    origin: Origin,
    snapshot: Arc<ConfigSnapshot>,
}

#[derive(Debug, Default)]
struct PersistState {
    /// Newest generation known to be on disk
    persisted: u64,
}

/// Whether an update reached durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    Durable,
    /// The in-memory update stands but may be lost on restart.
    Degraded { reason: String },
}

impl PersistStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, PersistStatus::Degraded { .. })
    }
}

/// Result of a successful `update` or `reset`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub snapshot: ConfigSnapshot,
    pub persistence: PersistStatus,
}

pub struct ConfigStore {
    settings: StoreSettings,

    persistence: Box<dyn Persistence>,

    current: ArcSwap<Versioned>,

    /// Guards merge + swap
    writer: Mutex<()>,

    /// Serializes disk writes and disk refreshes
    persist: Mutex<PersistState>,

    /// Fingerprint of the last version this store wrote or read
    known: Mutex<Option<Fingerprint>>,
}

impl ConfigStore {
    /// Open the store at the canonical path named by `settings`.
    pub fn open(settings: StoreSettings) -> Arc<Self> {
        let persistence = Box::new(FilePersistence::new(settings.path.clone()));
        Self::with_persistence(settings, persistence)
    }

    /// Open the store over any persistence backend.
    ///
    /// A missing or unreadable document is replaced by defaults, which are
    /// written back immediately.
    pub fn with_persistence(
        settings: StoreSettings,
        persistence: Box<dyn Persistence>,
    ) -> Arc<Self> {
        let (snapshot, origin, known) = match persistence.load() {
            LoadOutcome::Found {
                snapshot,
                fingerprint,
            } => {
                info!("Loaded configuration from {}", persistence.location().display());
                (snapshot, Origin::Disk, fingerprint)
            }
            LoadOutcome::NotFound(reason) => {
                log_not_found(persistence.location(), &reason);
                (default_snapshot(), Origin::Local, None)
            }
        };

        let store = Arc::new(Self {
            settings,
            persistence,
            current: ArcSwap::from_pointee(Versioned {
                generation: 1,
                origin,
                snapshot: Arc::new(snapshot),
            }),
            writer: Mutex::new(()),
            persist: Mutex::new(PersistState::default()),
            known: Mutex::new(known),
        });

        if origin == Origin::Local {
            if let PersistStatus::Degraded { reason } = store.persist_latest() {
                warn!("Running without a persisted configuration: {}", reason);
                *store.known.lock() = store.persistence.fingerprint();
            }
        } else {
            store.persist.lock().persisted = 1;
        }

        store
    }

    /// Async view sharing this instance.
    pub fn to_async(self: &Arc<Self>) -> AsyncConfigStore {
        AsyncConfigStore::new(Arc::clone(self))
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Canonical file location
    pub fn path(&self) -> &Path {
        self.persistence.location()
    }

    /// Shared handle to the current snapshot.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        if self.settings.refresh_from_disk {
            self.refresh_if_stale();
        }
        self.cached()
    }

    /// Independent copy of the current snapshot.
    pub fn load(&self) -> ConfigSnapshot {
        (*self.snapshot()).clone()
    }

    /// Value of a named or extension field, or `default`.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.snapshot().get(key).unwrap_or(default)
    }

    /// Text form of a field, or `default`.
    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.snapshot().get(key) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }

    /// Snapshot pinned for one worker session.
    pub fn begin_session(&self) -> Session {
        Session::new(self.snapshot())
    }

    /// Merge `request` into the current snapshot and persist the result.
    ///
    /// Fails only when the writer lock cannot be taken within the
    /// configured timeout. Persistence failures are reported through
    /// [`UpdateOutcome::persistence`].
    pub fn update(&self, request: UpdateRequest) -> Result<UpdateOutcome> {
        let snapshot = {
            let _writer = self.lock_writer()?;
            if self.settings.refresh_from_disk {
                self.refresh_locked();
            }

            let merged = self.cached().merged(&request);
            debug!(
                "Applying update to {:?} at {:.6}",
                request.keys(),
                merged.last_updated()
            );
            self.swap(merged, Origin::Local)
        };

        let persistence = self.persist_latest();
        Ok(UpdateOutcome {
            snapshot: (*snapshot).clone(),
            persistence,
        })
    }

    /// Replace the configuration with built-in defaults.
    pub fn reset(&self) -> Result<UpdateOutcome> {
        let snapshot = {
            let _writer = self.lock_writer()?;
            let previous = self.cached().last_updated();
            info!("Resetting configuration to defaults");
            self.swap(ConfigSnapshot::default().stamped(previous), Origin::Local)
        };

        let persistence = self.persist_latest();
        Ok(UpdateOutcome {
            snapshot: (*snapshot).clone(),
            persistence,
        })
    }

    /// Current in-memory snapshot, without checking the canonical file.
    pub(crate) fn cached(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.current.load().snapshot)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        self.writer
            .try_lock_for(self.settings.lock_timeout)
            .ok_or(StoreError::LockTimeout(self.settings.lock_timeout))
    }

    /// Must be called with the writer lock held.
    fn swap(&self, snapshot: ConfigSnapshot, origin: Origin) -> Arc<ConfigSnapshot> {
        let generation = self.current.load().generation + 1;
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::new(Versioned {
            generation,
            origin,
            snapshot: Arc::clone(&snapshot),
        }));
        snapshot
    }

    fn refresh_if_stale(&self) {
        // A local write in flight means memory is at least as new as disk.
        if self.persist.is_locked() || self.is_fresh() {
            return;
        }

        match self.writer.try_lock_for(self.settings.lock_timeout) {
            Some(_writer) => self.refresh_locked(),
            None => debug!("Writer busy, serving cached configuration"),
        }
    }

    /// True while the canonical file is the version we last wrote or
    /// read, including "absent" when nothing could be written.
    fn is_fresh(&self) -> bool {
        self.persistence.fingerprint() == *self.known.lock()
    }

    /// Adopt whatever is on disk if it is not the version we last saw.
    /// Must be called with the writer lock held.
    fn refresh_locked(&self) {
        let Some(mut state) = self.persist.try_lock() else {
            debug!("Write in flight, skipping refresh");
            return;
        };

        // Re-check now that no write is in flight.
        if self.is_fresh() {
            return;
        }

        match self.persistence.load() {
            LoadOutcome::Found {
                snapshot,
                fingerprint,
            } => {
                info!(
                    "Configuration changed on disk, reloading {}",
                    self.path().display()
                );
                self.swap(snapshot, Origin::Disk);
                state.persisted = self.current.load().generation;
                *self.known.lock() = fingerprint;
            }
            LoadOutcome::NotFound(reason) => {
                log_not_found(self.path(), &reason);
                let previous = self.cached().last_updated();
                self.swap(default_snapshot().stamped(previous), Origin::Local);
                if let PersistStatus::Degraded { reason } = self.write_latest(&mut state) {
                    warn!("Could not recreate {}: {}", self.path().display(), reason);
                    // Remember what is there so the next read does not
                    // reinitialize again.
                    *self.known.lock() = self.persistence.fingerprint();
                }
            }
        }
    }

    fn persist_latest(&self) -> PersistStatus {
        let mut state = self.persist.lock();
        self.write_latest(&mut state)
    }

    /// Write the newest snapshot unless it is already on disk. Must be
    /// called with the persist lock held.
    fn write_latest(&self, state: &mut PersistState) -> PersistStatus {
        let latest = self.current.load_full();
        if latest.generation <= state.persisted {
            return PersistStatus::Durable;
        }
        if latest.origin == Origin::Disk {
            state.persisted = latest.generation;
            return PersistStatus::Durable;
        }

        let attempts = self.settings.persist_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.persistence.save(&latest.snapshot) {
                Ok(fingerprint) => {
                    state.persisted = latest.generation;
                    *self.known.lock() = fingerprint;
                    debug!("Persisted generation {}", latest.generation);
                    return PersistStatus::Durable;
                }
                Err(e) => {
                    warn!(
                        "Failed to persist configuration (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    last_error = e.to_string();
                }
            }
        }

        warn!("Continuing with in-memory configuration only");
        PersistStatus::Degraded { reason: last_error }
    }
}

fn log_not_found(path: &Path, reason: &NotFound) {
    match reason {
        NotFound::Missing => info!(
            "No configuration at {}, initializing defaults",
            path.display()
        ),
        NotFound::Unreadable(e) => warn!(
            "Cannot read {}: {}. Initializing defaults",
            path.display(),
            e
        ),
        NotFound::Corrupt(e) => warn!(
            "Corrupt configuration at {}: {}. Initializing defaults",
            path.display(),
            e
        ),
    }
}
