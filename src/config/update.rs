//! Partial updates applied by writers

use crate::config::TtsEmotion;
use crate::types::{Result, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// A partial field set. Anything left unset survives the merge untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    caller_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent_instructions: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tts_language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tts_emotion: Option<String>,

    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

impl UpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caller_name(mut self, value: impl Into<String>) -> Self {
        self.caller_name = Some(value.into());
        self
    }

    pub fn agent_instructions(mut self, value: impl Into<String>) -> Self {
        self.agent_instructions = Some(value.into());
        self
    }

    pub fn tts_language(mut self, value: impl Into<String>) -> Self {
        self.tts_language = Some(value.into());
        self
    }

    /// Sets the raw emotion tag; the store does not validate it.
    pub fn tts_emotion(mut self, value: impl Into<String>) -> Self {
        self.tts_emotion = Some(value.into());
        self
    }

    pub fn emotion(self, emotion: TtsEmotion) -> Self {
        self.tts_emotion(emotion.as_str())
    }

    /// Sets a field by name. Named fields take the value's text form;
    /// other keys go to the extension map.
    pub fn extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key.into(), value);
        self
    }

    fn insert(&mut self, key: String, value: Value) {
        match key.as_str() {
            "caller_name" => self.caller_name = Some(as_text(&value)),
            "agent_instructions" => self.agent_instructions = Some(as_text(&value)),
            "tts_language" => self.tts_language = Some(as_text(&value)),
            "tts_emotion" => self.tts_emotion = Some(as_text(&value)),
            "last_updated" => debug!("Ignoring writer-supplied last_updated"),
            _ => {
                self.extensions.insert(key, value);
            }
        }
    }

    /// Build a request from `KEY=VALUE` strings.
    ///
    /// Extension values that parse as JSON (numbers, booleans, objects)
    /// keep that type; everything else is stored as text.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::new();

        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (key, raw) = assignment
                .split_once('=')
                .ok_or_else(|| StoreError::InvalidAssignment(assignment.to_string()))?;

            let key = key.trim();
            if key.is_empty() {
                return Err(StoreError::InvalidAssignment(assignment.to_string()));
            }

            let value = serde_json::from_str::<Value>(raw)
                .ok()
                .filter(|v| !v.is_string())
                .unwrap_or_else(|| Value::String(raw.to_string()));
            request.insert(key.to_string(), value);
        }

        Ok(request)
    }

    pub fn is_empty(&self) -> bool {
        self.caller_name.is_none()
            && self.agent_instructions.is_none()
            && self.tts_language.is_none()
            && self.tts_emotion.is_none()
            && self.extension_values().next().is_none()
    }

    /// Names of the fields this request touches.
    pub fn keys(&self) -> Vec<&str> {
        let named = [
            ("caller_name", self.caller_name.is_some()),
            ("agent_instructions", self.agent_instructions.is_some()),
            ("tts_language", self.tts_language.is_some()),
            ("tts_emotion", self.tts_emotion.is_some()),
        ];

        named
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name)
            .chain(
                self.extensions
                    .keys()
                    .map(String::as_str)
                    .filter(|k| *k != "last_updated"),
            )
            .collect()
    }

    pub(crate) fn caller_name_value(&self) -> Option<&str> {
        self.caller_name.as_deref()
    }

    pub(crate) fn agent_instructions_value(&self) -> Option<&str> {
        self.agent_instructions.as_deref()
    }

    pub(crate) fn tts_language_value(&self) -> Option<&str> {
        self.tts_language.as_deref()
    }

    pub(crate) fn tts_emotion_value(&self) -> Option<&str> {
        self.tts_emotion.as_deref()
    }

    /// Extension entries, minus the store-owned timestamp that a
    /// deserialized request may carry.
    pub(crate) fn extension_values(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.extensions.iter().filter(|(k, _)| k.as_str() != "last_updated")
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
