//! Block-level Q15 gain helpers.
//!
//! Q15: an `i16` value `v` represents `v / 32768`, a fraction in `[-1, 1)`.
//! Gains are carried in an `i32` so that unity (32768) and boosts above 1.0
//! are representable.

use super::intrinsics::{saturate16, saturate16_wide};

/// Product of two Q15 fractions, saturated.
///
/// Only `-1.0 * -1.0` overflows; it clamps to `i16::MAX`.
#[inline(always)]
pub fn saturating_multiply_q15(a: i16, b: i16) -> i16 {
    saturate16((a as i32 * b as i32) >> 15)
}

/// Scale one sample by a Q15 gain held in an `i32`.
///
/// Computes `saturate16((sample * gain) >> 15)`.
#[inline(always)]
pub fn apply_gain_q15(sample: i16, gain: i32) -> i16 {
    saturate16_wide((sample as i64 * gain as i64) >> 15)
}

/// Scale a whole block in place by a Q15 `gain`.
pub fn block_multiply(block: &mut [i16], gain: i32) {
    block
        .iter_mut()
        .for_each(|sample| *sample = apply_gain_q15(*sample, gain));
}
