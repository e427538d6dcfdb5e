//! # PCM Framing Module
//!
//! Converts captured float samples into the fixed-size signed 16-bit
//! little-endian blocks the pitch-detection service expects: one binary
//! message per block, no envelope, no sequence numbers, strict capture order.

/// Samples per audio block.
///
/// Large enough to give the detector usable signal at low guitar
/// frequencies (~73 Hz), small enough to keep the round trip perceptually
/// live (~93 ms of audio per block at 44.1 kHz).
pub const BLOCK_SIZE: usize = 4096;

/// Capture sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44100;

/// Encodes float samples in [-1.0, 1.0] as PCM16 LE bytes.
///
/// Samples are clamped before scaling. Scaling is the standard symmetric
/// quantization: negative samples scale by 32768, non-negative by 32767, so
/// both -1.0 and 1.0 map onto the full i16 range without overflow.
///
/// The output is always exactly `2 * samples.len()` bytes.
pub fn encode_pcm16_le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let s = sample.clamp(-1.0, 1.0);
        let v = if s < 0.0 {
            (s * 32768.0) as i16
        } else {
            (s * 32767.0) as i16
        };
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decodes PCM16 LE bytes back to floats. Used by tests and diagnostics;
/// the live pipeline only encodes. A trailing odd byte is ignored.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}
