//! Audio pipeline: PCM decoding, WAV encoding, live output, synthesis.

pub mod drone;
pub mod engine;
pub mod pcm;
pub mod voice;
pub mod wav;

pub use drone::{AmbientDrone, AmbientPad};
pub use engine::{AudioEngine, MixerSource};
pub use pcm::{decode_raw_clip, SampleBuffer};
pub use voice::VoicePlayback;
pub use wav::{encode_wav, wrap_raw_clip};
