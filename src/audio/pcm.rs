//! Raw PCM narration decoding.
//!
//! The speech collaborator returns base64-encoded headerless PCM: 16-bit
//! signed little-endian, mono, 24 kHz. This module turns that payload into
//! the float sample buffer shared by playback, synthesis and export.

use crate::defaults::SPEECH_SAMPLE_RATE;
use crate::error::{DreamQuestError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Decoded single-channel audio with samples in [-1, 1].
///
/// The common intermediate between the decoder, the playback engine and the
/// video renderer's audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration of the buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Duration of the buffer in whole milliseconds, rounded down.
    pub fn duration_ms(&self) -> u64 {
        (self.duration_secs() * 1000.0) as u64
    }

    /// Resample to `target_rate` with linear interpolation.
    ///
    /// Good enough for speech; narration clips arrive at 24 kHz and the
    /// output mix runs at 44.1 kHz.
    pub fn resampled(&self, target_rate: u32) -> SampleBuffer {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return SampleBuffer::new(self.samples.clone(), target_rate);
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let output_len = (self.samples.len() as f64 / ratio).ceil() as usize;

        let samples = (0..output_len)
            .map(|i| {
                let source_pos = i as f64 * ratio;
                let source_idx = source_pos.floor() as usize;
                let fraction = (source_pos - source_idx as f64) as f32;

                if source_idx + 1 >= self.samples.len() {
                    self.samples[self.samples.len() - 1]
                } else {
                    let left = self.samples[source_idx];
                    let right = self.samples[source_idx + 1];
                    left + (right - left) * fraction
                }
            })
            .collect();

        SampleBuffer::new(samples, target_rate)
    }

    /// Convert back to interleaved 16-bit PCM bytes (little-endian).
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for &s in &self.samples {
            let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }
}

/// Decode a base64 raw-PCM narration clip into a [`SampleBuffer`].
///
/// Each 16-bit sample is divided by 32768.0 to map into [-1, 1]. A dangling
/// trailing byte (truncated final sample) is dropped rather than rejected.
///
/// # Errors
///
/// Returns [`DreamQuestError::AudioDecode`] on malformed base64 or an empty
/// payload. Callers treat this as "no narration for this turn", never as
/// fatal.
pub fn decode_raw_clip(clip: &str) -> Result<SampleBuffer> {
    let bytes = BASE64
        .decode(clip.trim())
        .map_err(|e| DreamQuestError::AudioDecode {
            message: format!("Invalid base64 in narration clip: {}", e),
        })?;

    if bytes.len() < 2 {
        return Err(DreamQuestError::AudioDecode {
            message: format!("Narration clip too short: {} byte(s)", bytes.len()),
        });
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(SampleBuffer::new(samples, SPEECH_SAMPLE_RATE))
}

/// Decode a base64 raw-PCM clip to its underlying bytes, unmodified.
///
/// Used by the WAV encoder, which wraps the payload without resampling or
/// rescaling it.
pub fn decode_clip_bytes(clip: &str) -> Result<Vec<u8>> {
    let bytes = BASE64
        .decode(clip.trim())
        .map_err(|e| DreamQuestError::AudioDecode {
            message: format!("Invalid base64 in narration clip: {}", e),
        })?;

    if bytes.is_empty() {
        return Err(DreamQuestError::AudioDecode {
            message: "Empty narration clip".to_string(),
        });
    }

    Ok(bytes)
}
