//! Offline video rendering of the adventure log.
//!
//! Each scene becomes a still frame held for the length of its narration
//! (plus a short tail) or a reading-speed estimate when no narration
//! exists. The soundtrack lays every narration clip at its scene offset
//! over a continuous ambient drone bed, and ffmpeg muxes the result into
//! WebM or MP4 depending on what the local build can encode.

pub mod encoder;
pub mod frame;

use crate::audio::{decode_raw_clip, encode_wav, AmbientDrone, SampleBuffer};
use crate::defaults::{
    EXPORT_STEM, SCENE_MIN_MS, SCENE_MS_PER_CHAR, SCENE_TRAILING_PAD_MS, SPEECH_SAMPLE_RATE,
    VIDEO_FPS, VIDEO_HEIGHT, VIDEO_WIDTH,
};
use crate::error::Result;
use crate::export::storybook::sanitize_name;
use crate::story::{SessionMeta, StoryLogEntry};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use encoder::{probe_format, CommandExecutor, FfmpegRecorder, SystemCommandExecutor, VideoFormat};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// What a render request produced.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Finished video at this path.
    Completed(PathBuf),
    /// Another render is already in flight; nothing was written.
    Busy,
}

/// One scene resolved to its frame inputs and timeline slot.
struct ScenePlan {
    narrative: String,
    image_bytes: Option<Vec<u8>>,
    narration: Option<SampleBuffer>,
    duration_ms: u64,
}

/// Renders the story log to a video file, one render at a time.
pub struct VideoRenderer {
    rendering: AtomicBool,
}

/// Clears the in-flight flag even when a render errors out.
struct RenderGuard<'a>(&'a AtomicBool);

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for VideoRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoRenderer {
    pub fn new() -> Self {
        Self {
            rendering: AtomicBool::new(false),
        }
    }

    /// Render `entries` into `out_dir`.
    ///
    /// Concurrent calls beyond the first return `Busy` without touching
    /// the filesystem. On error no output file is left behind.
    pub fn render(
        &self,
        entries: &[StoryLogEntry],
        meta: &SessionMeta,
        out_dir: &Path,
    ) -> Result<RenderOutcome> {
        if self
            .rendering
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(RenderOutcome::Busy);
        }
        let _guard = RenderGuard(&self.rendering);

        let format = probe_format(&SystemCommandExecutor::new())?;
        let scenes = plan_scenes(entries);
        if scenes.is_empty() {
            return Err(crate::error::DreamQuestError::Render {
                message: "nothing to render yet".to_string(),
            });
        }

        let final_path = out_dir.join(video_filename(&meta.character_name, format));
        let part_path = out_dir.join(format!(
            ".{}.part.{}",
            std::process::id(),
            format.extension()
        ));
        let wav_path = std::env::temp_dir().join(format!("dreamquest-track-{}.wav", std::process::id()));

        let result = self.encode(&scenes, format, &wav_path, &part_path);
        let _ = std::fs::remove_file(&wav_path);
        if let Err(e) = result {
            let _ = std::fs::remove_file(&part_path);
            return Err(e);
        }

        std::fs::rename(&part_path, &final_path)?;
        eprintln!("Video saved to {}", final_path.display());
        Ok(RenderOutcome::Completed(final_path))
    }

    fn encode(
        &self,
        scenes: &[ScenePlan],
        format: VideoFormat,
        wav_path: &Path,
        part_path: &Path,
    ) -> Result<()> {
        let track = mix_soundtrack(scenes);
        std::fs::write(wav_path, encode_wav(&track.to_pcm_bytes(), SPEECH_SAMPLE_RATE))?;

        let font = frame::load_system_font();
        if font.is_none() {
            eprintln!("No usable system font found; rendering frames without captions");
        }

        let mut recorder = FfmpegRecorder::spawn(
            format,
            VIDEO_WIDTH,
            VIDEO_HEIGHT,
            VIDEO_FPS,
            wav_path,
            part_path,
        )?;

        for scene in scenes {
            let painted =
                frame::paint_scene(scene.image_bytes.as_deref(), &scene.narrative, font.as_ref());
            let frames = scene_frame_count(scene.duration_ms);
            for _ in 0..frames {
                recorder.write_frame(&painted.data)?;
            }
        }

        recorder.finish()
    }

    /// Probe whether this machine can encode at all, for diagnostics.
    pub fn available<E: CommandExecutor>(executor: &E) -> Result<VideoFormat> {
        probe_format(executor)
    }
}

/// Resolve every scene's media and duration, degrading per entry.
fn plan_scenes(entries: &[StoryLogEntry]) -> Vec<ScenePlan> {
    entries
        .iter()
        .filter(|e| !e.narrative.trim().is_empty())
        .map(|entry| {
            let narration = entry.audio.as_deref().and_then(|clip| {
                match decode_raw_clip(clip) {
                    Ok(buf) => Some(buf),
                    Err(e) => {
                        eprintln!("Skipping narration for one scene: {}", e);
                        None
                    }
                }
            });
            let duration_ms = scene_duration_ms(&entry.narrative, narration.as_ref());
            ScenePlan {
                narrative: entry.narrative.clone(),
                image_bytes: entry.image.as_deref().and_then(decode_data_uri),
                narration,
                duration_ms,
            }
        })
        .collect()
}

/// How long a scene stays on screen.
///
/// Narrated scenes run the clip plus a short tail; silent scenes hold for
/// a reading-speed estimate, never less than three seconds.
fn scene_duration_ms(narrative: &str, narration: Option<&SampleBuffer>) -> u64 {
    match narration {
        Some(buf) => buf.duration_ms() + SCENE_TRAILING_PAD_MS,
        None => SCENE_MIN_MS.max(SCENE_MS_PER_CHAR * narrative.chars().count() as u64),
    }
}

fn scene_frame_count(duration_ms: u64) -> u64 {
    (duration_ms * VIDEO_FPS as u64).div_ceil(1000)
}

/// Lay narration clips at their scene offsets over a drone bed.
fn mix_soundtrack(scenes: &[ScenePlan]) -> SampleBuffer {
    let total_ms: u64 = scenes.iter().map(|s| s.duration_ms).sum();
    let total_secs = total_ms as f64 / 1000.0;
    let mut samples = AmbientDrone::render_offline(SPEECH_SAMPLE_RATE, total_secs);

    let mut offset_ms = 0u64;
    for scene in scenes {
        if let Some(buf) = &scene.narration {
            let clip = buf.resampled(SPEECH_SAMPLE_RATE);
            let start = (offset_ms * SPEECH_SAMPLE_RATE as u64 / 1000) as usize;
            for (i, s) in clip.samples.iter().enumerate() {
                if let Some(slot) = samples.get_mut(start + i) {
                    *slot = (*slot + s).clamp(-1.0, 1.0);
                }
            }
        }
        offset_ms += scene.duration_ms;
    }

    SampleBuffer::new(samples, SPEECH_SAMPLE_RATE)
}

/// Pull the payload out of a `data:` URI; bad URIs lose the image only.
fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let (_, payload) = uri.split_once(",")?;
    match STANDARD.decode(payload) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            eprintln!("Skipping scene image with malformed data URI: {}", e);
            None
        }
    }
}

/// Video filenames carry only the character name. Unlike the storybook,
/// a re-render replaces the previous file for the same character.
fn video_filename(character_name: &str, format: VideoFormat) -> String {
    format!(
        "{}-{}.{}",
        EXPORT_STEM,
        sanitize_name(character_name),
        format.extension()
    )
}
