//! Saturation primitives for fixed-point sample arithmetic.
//!
//! These are the only places where an out-of-range intermediate is clamped
//! to the 16-bit output scale. Everything else in [`dsp`](crate::dsp) either
//! stays in range by construction or calls through here.

/// Arithmetic-shift `val` right by `RSHIFT`, then clamp it to a signed
/// `BITS`-wide range. The shift truncates toward negative infinity.
#[inline(always)]
pub fn signed_saturate_rshift<const BITS: u32, const RSHIFT: u32>(val: i32) -> i32 {
    let shifted = val >> RSHIFT;
    let max = (1i32 << (BITS - 1)) - 1;
    let min = -(1i32 << (BITS - 1));
    shifted.clamp(min, max)
}

/// Clamp an `i32` sum to the 16-bit output scale.
#[inline(always)]
pub fn saturate16(val: i32) -> i16 {
    val.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Saturate an `i64` product to `i16` range.
#[inline(always)]
pub fn saturate16_wide(val: i64) -> i16 {
    val.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturate16_clamps_at_both_rails() {
        assert_eq!(saturate16(-7), -7);
        assert_eq!(saturate16(i16::MAX as i32 + 1), i16::MAX);
        assert_eq!(saturate16(i16::MIN as i32 - 1), i16::MIN);
        // Two full-scale sources summed.
        assert_eq!(saturate16(2 * 30_000), i16::MAX);
        assert_eq!(saturate16(-2 * 30_000), i16::MIN);
    }

    #[test]
    fn saturate16_wide_clamps_gain_products() {
        assert_eq!(saturate16_wide(1 << 40), i16::MAX);
        assert_eq!(saturate16_wide(-(1 << 40)), i16::MIN);
        assert_eq!(saturate16_wide(-1234), -1234);
    }

    #[test]
    fn rshift_then_clamp() {
        assert_eq!(signed_saturate_rshift::<12, 4>(0x7FF0), 0x7FF);
        assert_eq!(signed_saturate_rshift::<12, 3>(0x7FF0), 0x7FF);
        assert_eq!(signed_saturate_rshift::<12, 3>(-0x7FF0), -0x800);
        assert_eq!(signed_saturate_rshift::<16, 15>(1_024_000), 31);
    }

    #[test]
    fn rshift_truncates_toward_negative_infinity() {
        assert_eq!(signed_saturate_rshift::<16, 15>(-1), -1);
        assert_eq!(signed_saturate_rshift::<16, 15>(32767), 0);
        assert_eq!(signed_saturate_rshift::<16, 15>(-1_024_000), -32);
    }
}
