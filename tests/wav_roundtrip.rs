//! End-to-end audio pipeline: base64 raw PCM in, playable WAV out,
//! verified against an independent reader.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dreamquest::audio::wav::wrap_raw_clip;
use dreamquest::{decode_raw_clip, encode_wav};
use std::io::Cursor;

/// 440 Hz sine, one second, 24 kHz mono s16le — the shape narration
/// clips arrive in.
fn sine_clip_base64() -> (String, Vec<i16>) {
    let rate = 24_000u32;
    let samples: Vec<i16> = (0..rate)
        .map(|n| {
            let t = n as f32 / rate as f32;
            ((t * 440.0 * std::f32::consts::TAU).sin() * 12_000.0) as i16
        })
        .collect();
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    (STANDARD.encode(&bytes), samples)
}

#[test]
fn raw_clip_decodes_to_expected_length_and_rate() {
    let (clip, samples) = sine_clip_base64();
    let buf = decode_raw_clip(&clip).unwrap();
    assert_eq!(buf.samples.len(), samples.len());
    assert_eq!(buf.sample_rate, 24_000);
    assert!((buf.duration_secs() - 1.0).abs() < 1e-6);
}

#[test]
fn encoded_wav_reads_back_bit_exact_with_hound() {
    let (clip, samples) = sine_clip_base64();
    let pcm = STANDARD.decode(&clip).unwrap();
    let wav = encode_wav(&pcm, 24_000);

    let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded, samples);
}

#[test]
fn float_pipeline_round_trip_stays_within_one_lsb() {
    let (clip, samples) = sine_clip_base64();
    let buf = decode_raw_clip(&clip).unwrap();
    let wav = encode_wav(&buf.to_pcm_bytes(), buf.sample_rate);

    let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded.len(), samples.len());
    for (a, b) in decoded.iter().zip(&samples) {
        assert!((*a as i32 - *b as i32).abs() <= 1, "{} vs {}", a, b);
    }
}

#[test]
fn wrapped_clip_is_base64_of_a_valid_wav() {
    let (clip, samples) = sine_clip_base64();
    let wrapped = wrap_raw_clip(&clip, None).unwrap();
    let wav_bytes = STANDARD.decode(&wrapped).unwrap();

    assert_eq!(&wav_bytes[..4], b"RIFF");
    assert_eq!(&wav_bytes[8..12], b"WAVE");

    let mut reader = hound::WavReader::new(Cursor::new(wav_bytes)).unwrap();
    assert_eq!(reader.spec().sample_rate, 24_000);
    assert_eq!(reader.samples::<i16>().count(), samples.len());
}

#[test]
fn malformed_base64_is_rejected() {
    assert!(decode_raw_clip("not base64 at all!!!").is_err());
    assert!(wrap_raw_clip("@@@", None).is_err());
}

#[test]
fn resampling_preserves_duration() {
    let (clip, _) = sine_clip_base64();
    let buf = decode_raw_clip(&clip).unwrap();
    let up = buf.resampled(44_100);
    assert_eq!(up.sample_rate, 44_100);
    assert!((up.duration_secs() - buf.duration_secs()).abs() < 0.001);
}
