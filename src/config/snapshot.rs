//! Configuration snapshot types

use crate::config::defaults;
use crate::config::update::UpdateRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Point-in-time copy of the full call configuration.
///
/// Named fields are always present; anything else found in the persisted
/// document lives in the extension map and is written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(default = "defaults::caller_name")]
    caller_name: String,

    #[serde(default = "defaults::agent_instructions")]
    agent_instructions: String,

    #[serde(default = "defaults::tts_language")]
    tts_language: String,

    #[serde(default = "defaults::tts_emotion")]
    tts_emotion: String,

    /// Seconds since the Unix epoch, microsecond resolution
    #[serde(default)]
    last_updated: f64,

    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            caller_name: defaults::caller_name(),
            agent_instructions: defaults::agent_instructions(),
            tts_language: defaults::tts_language(),
            tts_emotion: defaults::tts_emotion(),
            last_updated: 0.0,
            extensions: BTreeMap::new(),
        }
    }
}

impl ConfigSnapshot {
    pub fn caller_name(&self) -> &str {
        &self.caller_name
    }

    pub fn agent_instructions(&self) -> &str {
        &self.agent_instructions
    }

    pub fn tts_language(&self) -> &str {
        &self.tts_language
    }

    /// Raw emotion tag. Use [`crate::TtsEmotion`] to validate it.
    pub fn tts_emotion(&self) -> &str {
        &self.tts_emotion
    }

    pub fn last_updated(&self) -> f64 {
        self.last_updated
    }

    pub fn extensions(&self) -> &BTreeMap<String, Value> {
        &self.extensions
    }

    /// Look up a named or extension field.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "caller_name" => Some(Value::String(self.caller_name.clone())),
            "agent_instructions" => Some(Value::String(self.agent_instructions.clone())),
            "tts_language" => Some(Value::String(self.tts_language.clone())),
            "tts_emotion" => Some(Value::String(self.tts_emotion.clone())),
            "last_updated" => serde_json::Number::from_f64(self.last_updated).map(Value::Number),
            other => self.extensions.get(other).cloned(),
        }
    }

    /// Shallow merge: every field present in `request` overrides ours.
    ///
    /// The result is stamped strictly after `self.last_updated`.
    pub(crate) fn merged(&self, request: &UpdateRequest) -> Self {
        let mut next = self.clone();

        if let Some(v) = request.caller_name_value() {
            next.caller_name = v.to_string();
        }
        if let Some(v) = request.agent_instructions_value() {
            next.agent_instructions = v.to_string();
        }
        if let Some(v) = request.tts_language_value() {
            next.tts_language = v.to_string();
        }
        if let Some(v) = request.tts_emotion_value() {
            next.tts_emotion = v.to_string();
        }
        for (key, value) in request.extension_values() {
            next.extensions.insert(key.clone(), value.clone());
        }

        next.stamped(self.last_updated)
    }

    /// Copy of `self` stamped with the current time, never earlier than
    /// one microsecond after `previous`.
    pub(crate) fn stamped(mut self, previous: f64) -> Self {
        self.last_updated = next_timestamp(previous);
        self
    }
}

/// Stamps are whole microseconds, so the value written to disk parses back
/// to the same `f64`.
fn next_timestamp(previous: f64) -> f64 {
    let now = chrono::Utc::now().timestamp_micros();
    let floor = (previous * MICROS_PER_SECOND).round() as i64 + 1;
    now.max(floor) as f64 / MICROS_PER_SECOND
}
