//! dreamquest - AI-narrated interactive fiction in the terminal
//!
//! Turn-based adventures with generated scenes, spoken narration over an
//! ambient drone pad, and storybook/video export of the finished log.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod story;

// Core audio surface (decode → mix → encode)
pub use audio::{
    decode_raw_clip, encode_wav, wrap_raw_clip, AmbientDrone, AudioEngine, MixerSource,
    SampleBuffer, VoicePlayback,
};

// Story types and collaborator traits
pub use story::generator::{Generators, ImageGenerator, SpeechGenerator, TextGenerator};
pub use story::session::{Session, SessionMeta};
pub use story::types::{Choice, HistoryItem, StoryLogEntry, StoryTurn};

// Export surface
pub use export::{export_storybook, RenderOutcome, VideoRenderer};

// Error handling
pub use error::{DreamQuestError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
