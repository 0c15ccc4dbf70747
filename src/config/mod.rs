//! Configuration data model and store settings
//!
//! - [`ConfigSnapshot`]: the full call configuration at one point in time
//! - [`UpdateRequest`]: a partial set of fields merged into a snapshot
//! - [`StoreSettings`]: how and where the store keeps its canonical file

pub mod defaults;
mod emotion;
mod loader;
mod settings;
mod snapshot;
mod update;

pub use defaults::default_snapshot;
pub use emotion::{TtsEmotion, UnknownEmotion};
pub use loader::{SettingsLoader, PATH_ENV, SETTINGS_ENV};
pub use settings::{default_canonical_path, SettingsFile, StoreSettings};
pub use snapshot::ConfigSnapshot;
pub use update::UpdateRequest;
