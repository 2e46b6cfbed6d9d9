//! PCM byte decoding and stereo interleave utilities.
//!
//! ## Output Frame Format
//!
//! The sink consumes interleaved stereo `i16` samples: `[L0, R0, L1, R1, ...]`.
//! The radio stream delivers the same layout as little-endian bytes:
//! `[L0_lo, L0_hi, R0_lo, R0_hi, ...]`.

use crate::dsp::intrinsics::saturate16;

/// Decode little-endian 16-bit PCM pairs from `bytes` into `out`.
///
/// Decodes `min(bytes.len() / 2, out.len())` samples and returns that count.
/// A trailing odd byte is ignored.
pub fn decode_le_pcm(bytes: &[u8], out: &mut [i16]) -> usize {
    let mut count = 0;
    for (dst, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        *dst = i16::from_le_bytes([pair[0], pair[1]]);
        count += 1;
    }
    count
}

/// Saturating-add a mono signal into both channels of an interleaved buffer.
///
/// # Panics
///
/// Debug-asserts that `stereo` holds exactly two samples per mono sample.
pub fn mix_mono_into_stereo(stereo: &mut [i16], mono: &[i16]) {
    debug_assert_eq!(stereo.len(), mono.len() * 2);

    for (frame, &sample) in stereo.chunks_exact_mut(2).zip(mono) {
        frame[0] = saturate16(frame[0] as i32 + sample as i32);
        frame[1] = saturate16(frame[1] as i32 + sample as i32);
    }
}

/// Fill an output buffer with silence.
pub fn silence(dest: &mut [i16]) {
    dest.fill(0);
}
