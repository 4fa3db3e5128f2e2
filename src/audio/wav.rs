//! WAV container encoding for export.
//!
//! Wraps raw 16-bit mono PCM in the canonical 44-byte WAV header so exported
//! storybooks can embed narration as independently playable audio. The
//! payload passes through unmodified; decoding the result with any standard
//! WAV reader reproduces the original samples exactly.

use crate::defaults::SPEECH_SAMPLE_RATE;
use crate::error::Result;
use crate::audio::pcm::decode_clip_bytes;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Bytes of PCM payload encoded per base64 chunk.
///
/// Multiple of 3 so chunk outputs concatenate without padding between them.
const BASE64_CHUNK_BYTES: usize = 0x8000 * 3;

/// Wrap raw 16-bit mono PCM bytes in a canonical WAV container.
///
/// Emits the standard 44-byte header (RIFF / "fmt " with PCM format code 1,
/// one channel, 16 bits per sample / "data") followed by the payload.
pub fn encode_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let channels: u16 = 1;
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = pcm.len() as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + pcm.len());

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    buf.extend_from_slice(pcm);

    buf
}

/// Base64-encode a byte buffer in bounded-size chunks.
///
/// Narration clips run to megabytes; encoding in fixed chunks keeps peak
/// allocation bounded regardless of clip length.
pub fn encode_base64_chunked(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(BASE64_CHUNK_BYTES) {
        BASE64.encode_string(chunk, &mut out);
    }
    out
}

/// Re-encode a base64 raw-PCM narration clip as a base64 WAV file.
///
/// This is the export path: raw clip in, embeddable `data:audio/wav` payload
/// out.
///
/// # Errors
///
/// Fails only if the input clip is not valid base64 or is empty.
pub fn wrap_raw_clip(clip: &str, sample_rate: Option<u32>) -> Result<String> {
    let pcm = decode_clip_bytes(clip)?;
    let wav = encode_wav(&pcm, sample_rate.unwrap_or(SPEECH_SAMPLE_RATE));
    Ok(encode_base64_chunked(&wav))
}
