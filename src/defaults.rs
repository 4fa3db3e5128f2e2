//! Default constants for dreamquest.
//!
//! Shared across the audio pipeline, the export paths, and configuration
//! defaults to keep the numbers in one place.

/// Sample rate of raw narration clips delivered by the speech collaborator.
///
/// The clips carry no header; 24 kHz mono 16-bit LE is an implicit contract
/// with the speech model, not something we can read out of the payload.
pub const SPEECH_SAMPLE_RATE: u32 = 24000;

/// Sample rate of the live output mix.
///
/// 44.1 kHz is accepted by effectively every output device; narration clips
/// are resampled up from 24 kHz when they enter the mix.
pub const OUTPUT_SAMPLE_RATE: u32 = 44100;

/// Frequencies of the four ambient drone voices in Hz.
///
/// A2 / C3 / E3 / G3 — a minor-tonality pad, low enough to sit under
/// narration.
pub const DRONE_CHORD: [f32; 4] = [110.0, 130.8, 164.8, 196.0];

/// Steady-state gain of the ambient drone mix.
///
/// Deliberately quiet: the drone is a bed, narration sits on top of it.
pub const DRONE_GAIN: f32 = 0.06;

/// Maximum random detune applied to each drone voice, in cents.
pub const DRONE_DETUNE_CENTS: f32 = 5.0;

/// Range of the per-voice amplitude LFO in Hz.
pub const DRONE_LFO_MIN_HZ: f32 = 0.1;
pub const DRONE_LFO_MAX_HZ: f32 = 0.3;

/// Depth of the per-voice amplitude LFO (0 = none, 1 = full tremolo).
pub const DRONE_LFO_DEPTH: f32 = 0.25;

/// Drone fade-in duration on start, in seconds.
pub const DRONE_FADE_IN_SECS: f32 = 3.0;

/// Drone fade-out duration on stop, in seconds.
///
/// Voices are torn down only after this fade completes, so a stop never
/// clicks.
pub const DRONE_FADE_OUT_SECS: f32 = 2.0;

/// Video frame geometry.
pub const VIDEO_WIDTH: u32 = 1280;
pub const VIDEO_HEIGHT: u32 = 720;

/// Frame rate of rendered video.
pub const VIDEO_FPS: u32 = 30;

/// Maximum characters per wrapped line in the video text band.
pub const VIDEO_MAX_LINE_CHARS: usize = 42;

/// Maximum visible lines in the video text band.
pub const VIDEO_MAX_LINES: usize = 4;

/// Trailing pad added after a scene's narration, in milliseconds.
pub const SCENE_TRAILING_PAD_MS: u64 = 500;

/// Minimum on-screen duration for a scene without narration.
pub const SCENE_MIN_MS: u64 = 3000;

/// Per-character dwell estimate for scenes without narration.
pub const SCENE_MS_PER_CHAR: u64 = 100;

/// Health bounds for the protagonist.
pub const HP_MIN: i32 = 0;
pub const HP_MAX: i32 = 100;

/// Key under which the single save slot is stored.
pub const SAVE_SLOT_KEY: &str = "dreamquest-save-v1";

/// Default narration/story language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Filename stem for export artifacts.
pub const EXPORT_STEM: &str = "DreamQuest";
