//! Configuration store and its persistence
//!
//! One [`ConfigStore`] per process, constructed at startup and handed to
//! request handlers (usually as [`AsyncConfigStore`]) and workers.

mod async_store;
mod config_store;
pub mod persistence;

pub use async_store::AsyncConfigStore;
pub use config_store::{ConfigStore, PersistStatus, UpdateOutcome};
pub use persistence::{FilePersistence, Fingerprint, LoadOutcome, NotFound, Persistence};
