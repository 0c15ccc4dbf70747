//! Worker-side session view
//!
//! A worker captures the configuration once when a session starts and uses
//! that view until the session ends; later updates do not reach it.

use crate::config::{ConfigSnapshot, TtsEmotion};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const INSTRUCTIONS_PREVIEW: usize = 100;

#[derive(Debug, Clone)]
pub struct Session {
    snapshot: Arc<ConfigSnapshot>,
    emotion: TtsEmotion,
}

impl Session {
    pub fn new(snapshot: Arc<ConfigSnapshot>) -> Self {
        let emotion = match snapshot.tts_emotion().parse::<TtsEmotion>() {
            Ok(emotion) => emotion,
            Err(e) => {
                warn!("{}, using {}", e, TtsEmotion::default());
                TtsEmotion::default()
            }
        };

        let preview: String = snapshot
            .agent_instructions()
            .chars()
            .take(INSTRUCTIONS_PREVIEW)
            .collect();
        info!(
            caller = snapshot.caller_name(),
            language = snapshot.tts_language(),
            emotion = %emotion,
            "Session configuration loaded: {}",
            preview
        );

        Self { snapshot, emotion }
    }

    pub fn caller_name(&self) -> &str {
        self.snapshot.caller_name()
    }

    pub fn instructions(&self) -> &str {
        self.snapshot.agent_instructions()
    }

    pub fn language(&self) -> &str {
        self.snapshot.tts_language()
    }

    /// Validated emotion; unknown tags fall back to the default.
    pub fn emotion(&self) -> TtsEmotion {
        self.emotion
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.snapshot.extensions().get(key)
    }

    /// The snapshot this session was started with.
    pub fn snapshot(&self) -> &ConfigSnapshot {
        &self.snapshot
    }

    /// Opening line spoken to the caller.
    pub fn greeting(&self, role: &str, organization: &str) -> String {
        format!(
            "Hello {}, I'm your {} from {}. How are you today?",
            self.caller_name(),
            role,
            organization
        )
    }
}
