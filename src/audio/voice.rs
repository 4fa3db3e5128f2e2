//! Narration playback controller.
//!
//! Manages the single live narration clip. The rule is clear-before-set: a
//! turn change or mute synchronously stops whatever is playing before any
//! new clip starts, so two turns' narration can never overlap.

use crate::audio::engine::MixerSource;
use crate::audio::pcm::{decode_raw_clip, SampleBuffer};
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A decoded clip being consumed by the mixer.
struct PlayingClip {
    samples: Vec<f32>,
    position: usize,
}

/// Controller half of narration playback. Clone-free; share via reference
/// or `Arc` — the mixer holds its own tap.
pub struct VoicePlayback {
    slot: Arc<Mutex<Option<PlayingClip>>>,
    speaking: Arc<AtomicBool>,
    enabled: AtomicBool,
}

impl Default for VoicePlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl VoicePlayback {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            speaking: Arc::new(AtomicBool::new(false)),
            enabled: AtomicBool::new(true),
        }
    }

    /// The mixer-facing end. Register once with the engine.
    pub fn tap(&self) -> Box<dyn MixerSource> {
        Box::new(VoiceTap {
            slot: Arc::clone(&self.slot),
            speaking: Arc::clone(&self.speaking),
        })
    }

    /// True while a clip is audibly playing.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Toggle narration. Disabling stops any in-flight clip immediately;
    /// re-enabling only takes effect for the next clip.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.clear();
        }
    }

    /// Synchronously stop and release the current clip, if any.
    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        self.speaking.store(false, Ordering::SeqCst);
    }

    /// Decode a raw narration clip and start playing it.
    ///
    /// Always clears the previous clip first. Does nothing while narration
    /// is disabled. Decode failure leaves the controller silent with the
    /// speaking flag cleared; callers log it and treat the turn as having
    /// no narration.
    pub fn play_clip(&self, clip: &str, mix_rate: u32) -> Result<()> {
        self.clear();
        if !self.is_enabled() {
            return Ok(());
        }

        let buffer: SampleBuffer = decode_raw_clip(clip)?.resampled(mix_rate);

        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(PlayingClip {
                samples: buffer.samples,
                position: 0,
            });
        }
        self.speaking.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Mixer source reading from the shared clip slot. Never exhausts — an
/// empty slot contributes silence, and the slot clearing itself is how the
/// controller cuts playback mid-clip.
struct VoiceTap {
    slot: Arc<Mutex<Option<PlayingClip>>>,
    speaking: Arc<AtomicBool>,
}

impl MixerSource for VoiceTap {
    fn mix_into(&mut self, frames: &mut [f32], _sample_rate: u32) -> bool {
        let mut finished = false;
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(clip) = slot.as_mut() {
                let remaining = clip.samples.len() - clip.position;
                let n = frames.len().min(remaining);
                for (f, &s) in frames
                    .iter_mut()
                    .zip(clip.samples[clip.position..clip.position + n].iter())
                {
                    *f += s;
                }
                clip.position += n;
                if clip.position >= clip.samples.len() {
                    finished = true;
                }
            }
            if finished {
                // Natural end of clip: release it and clear the flag
                *slot = None;
            }
        }
        if finished {
            self.speaking.store(false, Ordering::SeqCst);
        }
        true
    }
}
