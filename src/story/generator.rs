//! Collaborator seams for the external generation services.
//!
//! Text, image and speech generation are black boxes to the core: traits
//! consumed by the session, with mock implementations in tests. Failures
//! never crash the session — text falls back to a safe retry turn, image
//! and speech degrade to "no asset for this turn".

use crate::error::Result;
use crate::story::types::{HistoryItem, StoryTurn};
use async_trait::async_trait;
use std::sync::Arc;

/// Narrative/choice generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Open a new story from theme + protagonist name + language.
    async fn new_story(&self, theme: &str, protagonist: &str, language: &str)
        -> Result<StoryTurn>;

    /// Continue from recent history plus the player's latest action.
    async fn continue_story(
        &self,
        history: &[HistoryItem],
        action: &str,
        language: &str,
    ) -> Result<StoryTurn>;
}

/// Scene image generation from a visual description.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns encoded image bytes (PNG or JPEG).
    async fn generate(&self, description: &str) -> Result<Vec<u8>>;
}

/// Narration synthesis from narrative text.
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// Returns a base64 raw-PCM clip (24 kHz mono s16le, fixed voice).
    async fn synthesize(&self, narrative: &str) -> Result<String>;
}

/// The bundle of collaborators a session works against.
#[derive(Clone)]
pub struct Generators {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub speech: Arc<dyn SpeechGenerator>,
}

/// Reduce a text-generation outcome to a playable turn.
///
/// An error, or a turn with an out-of-range choice count, becomes the
/// fallback retry turn.
pub fn turn_or_fallback(result: Result<StoryTurn>) -> StoryTurn {
    match result {
        Ok(turn) if turn.has_valid_choices() => turn,
        Ok(_) => StoryTurn::fallback(),
        Err(e) => {
            eprintln!("dreamquest: text generation failed: {}", e);
            StoryTurn::fallback()
        }
    }
}
