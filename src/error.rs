//! Error types for dreamquest.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DreamQuestError {
    // Audio decode errors (malformed narration payloads)
    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    // Audio output errors (device, stream)
    #[error("Audio output device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio output failed: {message}")]
    AudioOutput { message: String },

    // Generation collaborator errors
    #[error("Text generation failed: {message}")]
    TextGeneration { message: String },

    #[error("Image generation failed: {message}")]
    ImageGeneration { message: String },

    #[error("Speech generation failed: {message}")]
    SpeechGeneration { message: String },

    // Persistence errors
    #[error("Save/load failed: {message}")]
    Persistence { message: String },

    // Export errors
    #[error("Storybook export failed: {message}")]
    Export { message: String },

    #[error("Video encoder tool not found: {tool}")]
    EncoderNotFound { tool: String },

    #[error("Video render failed: {message}")]
    Render { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DreamQuestError>;
