//! Built-in default values
//!
//! A snapshot always carries every named field; these fill the gaps when
//! nothing has been written yet or a persisted document omits a field.

use crate::config::snapshot::ConfigSnapshot;
use std::time::Duration;

pub const DEFAULT_CALLER_NAME: &str = "Guest";
pub const DEFAULT_AGENT_INSTRUCTIONS: &str = "You are a helpful voice AI assistant.";
pub const DEFAULT_TTS_LANGUAGE: &str = "en";
pub const DEFAULT_TTS_EMOTION: &str = "Calm";

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_PERSIST_RETRIES: u32 = 1;

/// File name of the canonical document inside the data directory
pub const CANONICAL_FILE_NAME: &str = "config.json";

pub(crate) fn caller_name() -> String {
    DEFAULT_CALLER_NAME.to_string()
}

pub(crate) fn agent_instructions() -> String {
    DEFAULT_AGENT_INSTRUCTIONS.to_string()
}

pub(crate) fn tts_language() -> String {
    DEFAULT_TTS_LANGUAGE.to_string()
}

pub(crate) fn tts_emotion() -> String {
    DEFAULT_TTS_EMOTION.to_string()
}

/// A default snapshot stamped with the current time.
pub fn default_snapshot() -> ConfigSnapshot {
    ConfigSnapshot::default().stamped(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_fields() {
        let snapshot = default_snapshot();
        assert_eq!(snapshot.caller_name(), "Guest");
        assert_eq!(snapshot.agent_instructions(), DEFAULT_AGENT_INSTRUCTIONS);
        assert_eq!(snapshot.tts_language(), "en");
        assert_eq!(snapshot.tts_emotion(), "Calm");
        assert!(snapshot.last_updated() > 0.0);
        assert!(snapshot.extensions().is_empty());
    }
}
