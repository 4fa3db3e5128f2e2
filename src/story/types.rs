//! Data model for story turns, history and the archived story log.

use serde::{Deserialize, Serialize};

/// One selectable action offered to the player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

/// One narrative beat produced by the text generator.
///
/// Immutable after creation; owned by the session until it is archived into
/// the story log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryTurn {
    pub narrative: String,
    #[serde(default)]
    pub visual_description: String,
    /// 2–4 entries in a well-formed turn.
    pub choices: Vec<Choice>,
    /// Signed health delta; the session clamps the result into [0, 100].
    #[serde(default)]
    pub hp_change: Option<i32>,
}

impl StoryTurn {
    /// Safe default turn used when the generator errors or returns
    /// unparseable output: a single retry choice and a neutral hp delta.
    pub fn fallback() -> Self {
        Self {
            narrative: "The mists of the dream swirl and the path ahead blurs. \
                        Something went wrong — gather yourself and try again."
                .to_string(),
            visual_description: String::new(),
            choices: vec![Choice {
                id: "retry".to_string(),
                text: "Try again".to_string(),
            }],
            hp_change: None,
        }
    }

    /// A well-formed turn offers between 2 and 4 choices.
    pub fn has_valid_choices(&self) -> bool {
        (2..=4).contains(&self.choices.len())
    }
}

/// Who said what in the conversational context sent back to the generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Append-only conversational history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryItem {
    pub role: Role,
    pub text: String,
}

impl HistoryItem {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// One completed turn's media, archived when the player chooses an action.
///
/// Binary media is intentionally dropped on save to respect storage-size
/// limits; a reloaded log carries narrative only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoryLogEntry {
    pub narrative: String,
    /// Scene image as a `data:` URI.
    #[serde(skip)]
    pub image: Option<String>,
    /// Narration clip as base64 raw PCM (24 kHz mono s16le).
    #[serde(skip)]
    pub audio: Option<String>,
}
