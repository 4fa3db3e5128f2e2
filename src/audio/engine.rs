//! Live audio output: a process-wide mixer feeding one output stream.
//!
//! The ambient drone and the narration playback both produce mono sample
//! streams; the engine sums them in the output callback and interleaves the
//! result across the device's channels. The engine is a process-wide
//! singleton with init-on-first-use and an explicit shutdown, so the two
//! subsystems coexist on one device without silencing each other.
//!
//! The cpal-backed stream lives behind the `playback` feature; the mixer
//! itself is device-free and fully testable headless.

use crate::defaults::OUTPUT_SAMPLE_RATE;
use crate::error::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

#[cfg(feature = "playback")]
use crate::error::DreamQuestError;
#[cfg(feature = "playback")]
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// A mono sample producer registered with the mixer.
///
/// `mix_into` adds its samples into `frames` (never overwrites — other
/// sources share the block) at the given rate. Returning `false` removes
/// the source from the mixer.
pub trait MixerSource: Send {
    fn mix_into(&mut self, frames: &mut [f32], sample_rate: u32) -> bool;
}

type SourceSet = Arc<Mutex<Vec<Box<dyn MixerSource>>>>;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses noisy ALSA/JACK/PipeWire messages that cpal triggers while
/// probing audio backends. The messages are harmless but confusing.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
#[cfg(feature = "playback")]
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched under the Mutex in `AudioEngine`;
/// its methods are called synchronously from one thread at a time.
#[cfg(feature = "playback")]
struct SendableStream(cpal::Stream);

#[cfg(feature = "playback")]
unsafe impl Send for SendableStream {}

/// Process-wide audio output.
pub struct AudioEngine {
    sources: SourceSet,
    /// Rate the mixer is actually running at. Starts at the preferred rate
    /// and is corrected if the device only accepts its native config.
    mix_rate: AtomicU32,
    #[cfg(feature = "playback")]
    stream: Mutex<Option<SendableStream>>,
}

static ENGINE: OnceLock<AudioEngine> = OnceLock::new();

impl AudioEngine {
    fn new() -> Self {
        Self {
            sources: Arc::new(Mutex::new(Vec::new())),
            mix_rate: AtomicU32::new(OUTPUT_SAMPLE_RATE),
            #[cfg(feature = "playback")]
            stream: Mutex::new(None),
        }
    }

    /// The process-wide engine, created on first use.
    pub fn global() -> &'static AudioEngine {
        ENGINE.get_or_init(AudioEngine::new)
    }

    /// A private engine for tests that must not share the global mixer.
    #[cfg(test)]
    pub(crate) fn new_for_test() -> Self {
        Self::new()
    }

    /// Register a source with the mixer.
    pub fn add_source(&self, source: Box<dyn MixerSource>) {
        if let Ok(mut sources) = self.sources.lock() {
            sources.push(source);
        }
    }

    /// Rate at which sources should produce samples.
    pub fn mix_rate(&self) -> u32 {
        self.mix_rate.load(Ordering::Relaxed)
    }

    /// Mix one mono block from all registered sources.
    ///
    /// This is the headless pull path used by tests; the output callback
    /// goes through the same source set.
    pub fn mix_block(&self, frames: &mut [f32]) {
        frames.fill(0.0);
        let rate = self.mix_rate();
        if let Ok(mut sources) = self.sources.lock() {
            sources.retain_mut(|s| s.mix_into(frames, rate));
        }
        for f in frames.iter_mut() {
            *f = f.clamp(-1.0, 1.0);
        }
    }

    /// Open the output stream and start pulling from the mixer.
    ///
    /// Already-started engines return Ok immediately, which is what makes a
    /// suspended output safe to "resume" before starting the drone.
    #[cfg(feature = "playback")]
    pub fn start(&self) -> Result<()> {
        {
            let guard = self.stream.lock().map_err(|e| DreamQuestError::AudioOutput {
                message: format!("Failed to lock stream: {}", e),
            })?;
            if guard.is_some() {
                return Ok(());
            }
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| DreamQuestError::AudioOutput {
            message: format!("Failed to start output stream: {}", e),
        })?;

        let mut guard = self.stream.lock().map_err(|e| DreamQuestError::AudioOutput {
            message: format!("Failed to lock stream: {}", e),
        })?;
        *guard = Some(SendableStream(stream));
        Ok(())
    }

    /// Without the `playback` feature there is no device; starting is a no-op
    /// so the export paths still run.
    #[cfg(not(feature = "playback"))]
    pub fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Stop and release the output stream.
    #[cfg(feature = "playback")]
    pub fn shutdown(&self) -> Result<()> {
        let mut guard = self.stream.lock().map_err(|e| DreamQuestError::AudioOutput {
            message: format!("Failed to lock stream: {}", e),
        })?;
        if let Some(stream) = guard.take() {
            stream.0.pause().map_err(|e| DreamQuestError::AudioOutput {
                message: format!("Failed to stop output stream: {}", e),
            })?;
        }
        Ok(())
    }

    #[cfg(not(feature = "playback"))]
    pub fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Build the output stream.
    ///
    /// Tries in order:
    /// 1. f32 stereo at the preferred mix rate
    /// 2. i16 stereo at the preferred mix rate
    /// 3. Device default config (native rate/channels), adjusting the mix rate
    #[cfg(feature = "playback")]
    fn build_stream(&self) -> Result<cpal::Stream> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();
            host.default_output_device()
                .ok_or_else(|| DreamQuestError::AudioDeviceNotFound {
                    device: "default".to_string(),
                })
        })?;

        let preferred_config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(OUTPUT_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("Audio output error: {}", err);
        };

        let sources = Arc::clone(&self.sources);
        if let Ok(stream) = device.build_output_stream(
            &preferred_config,
            make_f32_callback(sources, 2, OUTPUT_SAMPLE_RATE),
            err_callback,
            None,
        ) {
            self.mix_rate.store(OUTPUT_SAMPLE_RATE, Ordering::Relaxed);
            return Ok(stream);
        }

        let sources = Arc::clone(&self.sources);
        if let Ok(stream) = device.build_output_stream(
            &preferred_config,
            make_i16_callback(sources, 2, OUTPUT_SAMPLE_RATE),
            err_callback,
            None,
        ) {
            self.mix_rate.store(OUTPUT_SAMPLE_RATE, Ordering::Relaxed);
            return Ok(stream);
        }

        // Fall back to whatever the device natively speaks.
        let default_config =
            device
                .default_output_config()
                .map_err(|e| DreamQuestError::AudioOutput {
                    message: format!("Failed to query default output config: {}", e),
                })?;
        let native_rate = default_config.sample_rate().0;
        let channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let sources = Arc::clone(&self.sources);
        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_output_stream(
                    &stream_config,
                    make_f32_callback(sources, channels, native_rate),
                    err_callback,
                    None,
                )
                .map_err(|e| DreamQuestError::AudioOutput {
                    message: format!("Failed to build native f32 stream: {}", e),
                })?,
            cpal::SampleFormat::I16 => device
                .build_output_stream(
                    &stream_config,
                    make_i16_callback(sources, channels, native_rate),
                    err_callback,
                    None,
                )
                .map_err(|e| DreamQuestError::AudioOutput {
                    message: format!("Failed to build native i16 stream: {}", e),
                })?,
            fmt => {
                return Err(DreamQuestError::AudioOutput {
                    message: format!("Unsupported native sample format: {:?}", fmt),
                })
            }
        };

        self.mix_rate.store(native_rate, Ordering::Relaxed);
        Ok(stream)
    }
}

/// Mix one mono block from `sources` and interleave it into `write`.
#[cfg(any(feature = "playback", test))]
fn mix_interleaved(
    sources: &SourceSet,
    channels: usize,
    rate: u32,
    frame_count: usize,
    mut write: impl FnMut(usize, f32),
) {
    let mut mono = vec![0.0f32; frame_count];
    if let Ok(mut sources) = sources.lock() {
        sources.retain_mut(|s| s.mix_into(&mut mono, rate));
    }
    for (i, &s) in mono.iter().enumerate() {
        let s = s.clamp(-1.0, 1.0);
        for ch in 0..channels {
            write(i * channels + ch, s);
        }
    }
}

#[cfg(feature = "playback")]
fn make_f32_callback(
    sources: SourceSet,
    channels: usize,
    rate: u32,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [f32], _| {
        data.fill(0.0);
        let frames = data.len() / channels;
        mix_interleaved(&sources, channels, rate, frames, |idx, s| {
            if idx < data.len() {
                data[idx] = s;
            }
        });
    }
}

#[cfg(feature = "playback")]
fn make_i16_callback(
    sources: SourceSet,
    channels: usize,
    rate: u32,
) -> impl FnMut(&mut [i16], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [i16], _| {
        data.fill(0);
        let frames = data.len() / channels;
        mix_interleaved(&sources, channels, rate, frames, |idx, s| {
            if idx < data.len() {
                data[idx] = (s * i16::MAX as f32) as i16;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source emitting a constant value for a fixed number of samples.
    struct ConstSource {
        value: f32,
        remaining: usize,
    }

    impl MixerSource for ConstSource {
        fn mix_into(&mut self, frames: &mut [f32], _rate: u32) -> bool {
            let n = frames.len().min(self.remaining);
            for f in frames.iter_mut().take(n) {
                *f += self.value;
            }
            self.remaining -= n;
            self.remaining > 0
        }
    }

    #[test]
    fn mix_block_sums_sources() {
        let engine = AudioEngine::new_for_test();
        engine.add_source(Box::new(ConstSource {
            value: 0.25,
            remaining: 1000,
        }));
        engine.add_source(Box::new(ConstSource {
            value: 0.5,
            remaining: 1000,
        }));

        let mut block = [0.0f32; 64];
        engine.mix_block(&mut block);
        assert!(block.iter().all(|&s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn exhausted_sources_are_removed() {
        let engine = AudioEngine::new_for_test();
        engine.add_source(Box::new(ConstSource {
            value: 0.5,
            remaining: 16,
        }));

        let mut block = [0.0f32; 64];
        engine.mix_block(&mut block);
        // First 16 frames carry the source, the rest are silence
        assert!(block[..16].iter().all(|&s| s == 0.5));
        assert!(block[16..].iter().all(|&s| s == 0.0));

        // Source is gone now
        engine.mix_block(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn mix_block_clamps_to_unit_range() {
        let engine = AudioEngine::new_for_test();
        for _ in 0..4 {
            engine.add_source(Box::new(ConstSource {
                value: 0.9,
                remaining: 1000,
            }));
        }

        let mut block = [0.0f32; 32];
        engine.mix_block(&mut block);
        assert!(block.iter().all(|&s| s <= 1.0));
    }

    #[test]
    fn interleave_duplicates_across_channels() {
        let sources: SourceSet = Arc::new(Mutex::new(vec![Box::new(ConstSource {
            value: 0.5,
            remaining: 100,
        }) as Box<dyn MixerSource>]));

        let mut out = vec![0.0f32; 8];
        mix_interleaved(&sources, 2, 44100, 4, |idx, s| out[idx] = s);
        assert!(out.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn global_engine_is_a_singleton() {
        let a = AudioEngine::global() as *const _;
        let b = AudioEngine::global() as *const _;
        assert_eq!(a, b);
    }
}
