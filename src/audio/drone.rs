//! Procedural ambient drone synthesizer.
//!
//! A four-voice oscillator pad, independent of narrative content, that runs
//! under the narration as a continuous bed. Voices alternate between a pure
//! sine and a richer harmonic timbre, each randomly detuned by a few cents
//! and amplitude-modulated by a slow LFO so the pad never sounds static.
//!
//! The synthesizer is pure DSP: it produces mono samples on demand and has
//! no device dependency, so the same code drives the live mixer and the
//! offline render used by the video export.

use crate::defaults::{
    DRONE_CHORD, DRONE_DETUNE_CENTS, DRONE_FADE_IN_SECS, DRONE_FADE_OUT_SECS, DRONE_GAIN,
    DRONE_LFO_DEPTH, DRONE_LFO_MAX_HZ, DRONE_LFO_MIN_HZ,
};
use crate::audio::engine::MixerSource;
use rand::Rng;
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};

/// One oscillator voice with its amplitude LFO.
struct DroneVoice {
    /// Detuned frequency in Hz.
    freq: f32,
    /// Richer harmonic timbre instead of a pure sine.
    harmonic: bool,
    phase: f32,
    lfo_rate: f32,
    lfo_phase: f32,
}

impl DroneVoice {
    fn new(base_freq: f32, harmonic: bool) -> Self {
        let mut rng = rand::thread_rng();
        // ±5 cents of detune thickens the pad without sounding out of tune
        let cents = rng.gen_range(-DRONE_DETUNE_CENTS..=DRONE_DETUNE_CENTS);
        let freq = base_freq * 2f32.powf(cents / 1200.0);
        let lfo_rate = rng.gen_range(DRONE_LFO_MIN_HZ..=DRONE_LFO_MAX_HZ);
        let lfo_phase = rng.gen_range(0.0..TAU);

        Self {
            freq,
            harmonic,
            phase: 0.0,
            lfo_rate,
            lfo_phase,
        }
    }

    fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let tone = if self.harmonic {
            // Fundamental plus softened second and third partials
            let s = self.phase.sin() + 0.5 * (2.0 * self.phase).sin() + 0.25 * (3.0 * self.phase).sin();
            s / 1.75
        } else {
            self.phase.sin()
        };

        // Slow amplitude wobble around unity
        let lfo = 1.0 - DRONE_LFO_DEPTH * 0.5 * (1.0 + self.lfo_phase.sin());

        self.phase += TAU * self.freq / sample_rate;
        if self.phase > TAU {
            self.phase -= TAU;
        }
        self.lfo_phase += TAU * self.lfo_rate / sample_rate;
        if self.lfo_phase > TAU {
            self.lfo_phase -= TAU;
        }

        tone * lfo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DroneState {
    Stopped,
    Playing,
    /// Fading out; voices are released once the fade reaches silence.
    Stopping,
}

/// Stateful ambient pad generator.
///
/// State machine: Stopped → `start()` → Playing → `stop()` → Stopped, with a
/// linear 3 s fade-in on start and a 2 s fade-out on stop. `start()` while
/// playing and `stop()` while stopped are no-ops.
pub struct AmbientDrone {
    sample_rate: u32,
    state: DroneState,
    voices: Vec<DroneVoice>,
    /// Current overall gain, ramped toward `gain_target` each sample.
    gain: f32,
    gain_target: f32,
    gain_step: f32,
}

impl AmbientDrone {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: DroneState::Stopped,
            voices: Vec::new(),
            gain: 0.0,
            gain_target: 0.0,
            gain_step: 0.0,
        }
    }

    /// Start the pad: spawn the chord and begin the fade-in.
    ///
    /// No-op while already playing. Calling during the stop fade re-targets
    /// the ramp back up without respawning voices, so there is no click.
    pub fn start(&mut self) {
        match self.state {
            DroneState::Playing => {}
            DroneState::Stopping => {
                self.ramp_to(DRONE_GAIN, DRONE_FADE_IN_SECS);
                self.state = DroneState::Playing;
            }
            DroneState::Stopped => {
                self.voices = DRONE_CHORD
                    .iter()
                    .enumerate()
                    .map(|(i, &freq)| DroneVoice::new(freq, i % 2 == 1))
                    .collect();
                self.gain = 0.0;
                self.ramp_to(DRONE_GAIN, DRONE_FADE_IN_SECS);
                self.state = DroneState::Playing;
            }
        }
    }

    /// Begin the fade-out. Voices are torn down when the fade completes.
    ///
    /// No-op while stopped.
    pub fn stop(&mut self) {
        if self.state == DroneState::Playing {
            self.ramp_to(0.0, DRONE_FADE_OUT_SECS);
            self.state = DroneState::Stopping;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == DroneState::Playing
    }

    /// Number of live oscillator voices. Zero once teardown has run.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn ramp_to(&mut self, target: f32, secs: f32) {
        self.gain_target = target;
        let steps = secs * self.sample_rate as f32;
        self.gain_step = if steps > 0.0 {
            (target - self.gain) / steps
        } else {
            target - self.gain
        };
    }

    /// Produce the next mono sample.
    ///
    /// Returns 0.0 while stopped. Advancing past the end of the stop fade
    /// releases all voices.
    pub fn next_sample(&mut self) -> f32 {
        if self.voices.is_empty() {
            return 0.0;
        }

        let mix: f32 = self
            .voices
            .iter_mut()
            .map(|v| v.next_sample(self.sample_rate as f32))
            .sum::<f32>()
            / DRONE_CHORD.len() as f32;

        let sample = mix * self.gain;

        // Advance the linear gain ramp
        if self.gain_step != 0.0 {
            self.gain += self.gain_step;
            let done = (self.gain_step > 0.0 && self.gain >= self.gain_target)
                || (self.gain_step < 0.0 && self.gain <= self.gain_target);
            if done {
                self.gain = self.gain_target;
                self.gain_step = 0.0;
            }
        }

        // Fade-out complete: release the voices
        if self.state == DroneState::Stopping && self.gain <= 0.0 && self.gain_step == 0.0 {
            self.voices.clear();
            self.state = DroneState::Stopped;
        }

        sample
    }

    /// Follow the mixer's actual rate if the device forced a different one.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Mix `duration_secs` of drone into a fresh buffer at `sample_rate`.
    ///
    /// Used by the video renderer to lay an ambient bed under the whole
    /// timeline. Starts a dedicated instance so the live pad's state is
    /// untouched.
    pub fn render_offline(sample_rate: u32, duration_secs: f64) -> Vec<f32> {
        let mut drone = AmbientDrone::new(sample_rate);
        drone.start();
        let len = (duration_secs * sample_rate as f64).ceil() as usize;
        (0..len).map(|_| drone.next_sample()).collect()
    }
}

/// Shared handle: the UI toggles the pad while the mixer pulls samples.
#[derive(Clone)]
pub struct AmbientPad {
    inner: Arc<Mutex<AmbientDrone>>,
}

impl AmbientPad {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AmbientDrone::new(sample_rate))),
        }
    }

    pub fn start(&self) {
        if let Ok(mut drone) = self.inner.lock() {
            drone.start();
        }
    }

    pub fn stop(&self) {
        if let Ok(mut drone) = self.inner.lock() {
            drone.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().map(|d| d.is_playing()).unwrap_or(false)
    }

    /// The mixer-facing end of the pad. Register once with the engine.
    pub fn tap(&self) -> Box<dyn MixerSource> {
        Box::new(DroneTap(Arc::clone(&self.inner)))
    }
}

/// Mixer source that pulls from a shared [`AmbientDrone`]. Never exhausts;
/// a stopped pad just contributes silence.
struct DroneTap(Arc<Mutex<AmbientDrone>>);

impl MixerSource for DroneTap {
    fn mix_into(&mut self, frames: &mut [f32], sample_rate: u32) -> bool {
        if let Ok(mut drone) = self.0.lock() {
            drone.set_sample_rate(sample_rate);
            for f in frames.iter_mut() {
                *f += drone.next_sample();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(drone: &mut AmbientDrone, samples: usize) -> Vec<f32> {
        (0..samples).map(|_| drone.next_sample()).collect()
    }

    #[test]
    fn starts_stopped_and_silent() {
        let mut drone = AmbientDrone::new(48000);
        assert!(!drone.is_playing());
        assert_eq!(drone.voice_count(), 0);
        assert!(advance(&mut drone, 100).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn start_spawns_four_voices() {
        let mut drone = AmbientDrone::new(48000);
        drone.start();
        assert!(drone.is_playing());
        assert_eq!(drone.voice_count(), 4);
    }

    #[test]
    fn start_is_idempotent() {
        let mut drone = AmbientDrone::new(48000);
        drone.start();
        let _ = advance(&mut drone, 1000);
        let voices_before = drone.voice_count();
        drone.start();
        assert_eq!(drone.voice_count(), voices_before);
        assert!(drone.is_playing());
    }

    #[test]
    fn stop_is_idempotent_when_stopped() {
        let mut drone = AmbientDrone::new(48000);
        drone.stop();
        drone.stop();
        assert!(!drone.is_playing());
        assert_eq!(drone.voice_count(), 0);
    }

    #[test]
    fn fade_in_ramps_from_silence() {
        let rate = 8000;
        let mut drone = AmbientDrone::new(rate);
        drone.start();

        // First samples are near-silent; mid-fade is louder
        let early = advance(&mut drone, 80);
        let early_peak = early.iter().fold(0.0f32, |m, &s| m.max(s.abs()));

        let _ = advance(&mut drone, rate as usize); // skip ~1s into the fade
        let mid = advance(&mut drone, 800);
        let mid_peak = mid.iter().fold(0.0f32, |m, &s| m.max(s.abs()));

        assert!(early_peak < mid_peak, "{} !< {}", early_peak, mid_peak);
    }

    #[test]
    fn stop_fades_out_then_releases_voices() {
        let rate = 8000;
        let mut drone = AmbientDrone::new(rate);
        drone.start();
        // Get through the fade-in
        let _ = advance(&mut drone, (DRONE_FADE_IN_SECS * rate as f32) as usize + 10);

        drone.stop();
        assert!(!drone.is_playing());
        assert_eq!(drone.voice_count(), 4, "voices survive the fade");

        // Run past the 2s fade-out
        let tail = advance(&mut drone, (DRONE_FADE_OUT_SECS * rate as f32) as usize + 10);
        assert_eq!(drone.voice_count(), 0, "voices released after fade");
        assert_eq!(*tail.last().unwrap(), 0.0);
    }

    #[test]
    fn restart_during_fade_out_keeps_voices() {
        let rate = 8000;
        let mut drone = AmbientDrone::new(rate);
        drone.start();
        let _ = advance(&mut drone, rate as usize);
        drone.stop();
        let _ = advance(&mut drone, 100); // partway into the fade
        drone.start();
        assert!(drone.is_playing());
        assert_eq!(drone.voice_count(), 4);
    }

    #[test]
    fn output_stays_in_range() {
        let mut drone = AmbientDrone::new(8000);
        drone.start();
        for _ in 0..40_000 {
            let s = drone.next_sample();
            assert!(s.abs() <= 1.0, "sample out of range: {}", s);
        }
    }

    #[test]
    fn steady_state_respects_master_gain() {
        let rate = 8000;
        let mut drone = AmbientDrone::new(rate);
        drone.start();
        let _ = advance(&mut drone, (DRONE_FADE_IN_SECS * rate as f32) as usize + 100);
        let steady = advance(&mut drone, 4000);
        let peak = steady.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(peak <= DRONE_GAIN * 1.05, "peak {} above bed level", peak);
        assert!(peak > 0.0, "pad went silent");
    }

    #[test]
    fn offline_render_has_requested_length() {
        let samples = AmbientDrone::render_offline(24000, 0.5);
        assert_eq!(samples.len(), 12000);
        assert!(samples.iter().any(|&s| s != 0.0));
    }
}
