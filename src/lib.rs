//! callconf - dynamic per-call configuration store
//!
//! Request handlers write per-call parameters with `update` before placing
//! a call; voice agent workers read them once with `load` (or
//! `begin_session`) when their session starts. The store keeps one canonical
//! JSON file in sync with its in-memory snapshot and offers a blocking and
//! an async surface over the same instance.

pub mod config;
pub mod session;
pub mod store;
pub mod types;

pub use config::{ConfigSnapshot, SettingsLoader, StoreSettings, TtsEmotion, UpdateRequest};
pub use session::Session;
pub use store::{AsyncConfigStore, ConfigStore, PersistStatus, UpdateOutcome};
pub use types::StoreError;
