//! Voice-synthesis emotion tags
//!
//! The store keeps the tag as raw text; readers validate it here.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TtsEmotion {
    Neutral,
    #[default]
    Calm,
    Excited,
    Happy,
    Content,
    Curious,
    Sad,
    Angry,
    Scared,
    Surprised,
}

impl TtsEmotion {
    pub const ALL: [TtsEmotion; 10] = [
        TtsEmotion::Neutral,
        TtsEmotion::Calm,
        TtsEmotion::Excited,
        TtsEmotion::Happy,
        TtsEmotion::Content,
        TtsEmotion::Curious,
        TtsEmotion::Sad,
        TtsEmotion::Angry,
        TtsEmotion::Scared,
        TtsEmotion::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TtsEmotion::Neutral => "Neutral",
            TtsEmotion::Calm => "Calm",
            TtsEmotion::Excited => "Excited",
            TtsEmotion::Happy => "Happy",
            TtsEmotion::Content => "Content",
            TtsEmotion::Curious => "Curious",
            TtsEmotion::Sad => "Sad",
            TtsEmotion::Angry => "Angry",
            TtsEmotion::Scared => "Scared",
            TtsEmotion::Surprised => "Surprised",
        }
    }
}

impl fmt::Display for TtsEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown emotion tag '{0}'")]
pub struct UnknownEmotion(pub String);

impl FromStr for TtsEmotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        TtsEmotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}
