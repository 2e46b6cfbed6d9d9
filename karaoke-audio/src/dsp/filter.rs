//! 7-tap FIR low-pass and noise gate for the capture path.
//!
//! ## Fixed-point convention
//!
//! Coefficients are Q15 (`c / 32768`). Each output is the `i32` dot product
//! of the coefficients with the delay line, arithmetic-shifted right by 15.
//! The shift truncates toward negative infinity. The taps sum to 4352, so the
//! accumulator never exceeds `32768 * 4352` and the shifted result always
//! fits in `i16`.

use super::intrinsics::signed_saturate_rshift;

/// Number of taps in the low-pass filter.
pub const LOWPASS_TAPS: usize = 7;

/// Unique Q15 coefficients of the symmetric 7-tap low-pass, outermost first.
pub const LOWPASS_Q15: [i16; 4] = [175, 603, 886, 1024];

/// 7-tap low-pass filter (corner near 7 kHz at 32 kHz) with its delay line.
///
/// The delay line starts zeroed, so the first six outputs are a warm-up
/// transient. The filter state carries over between frames.
#[derive(Debug, Clone, Default)]
pub struct LowpassFilter {
    delay: [i16; LOWPASS_TAPS],
    /// Slot the next input is written to.
    index: usize,
}

impl LowpassFilter {
    /// Create a filter with a zeroed delay line.
    pub const fn new() -> Self {
        LowpassFilter {
            delay: [0; LOWPASS_TAPS],
            index: 0,
        }
    }

    /// Push one sample through the filter and return the filtered value.
    pub fn process(&mut self, x: i16) -> i16 {
        let i = self.index;
        self.delay[i] = x;

        let tap = |offset: usize| i32::from(self.delay[(i + offset) % LOWPASS_TAPS]);
        let [h0, h1, h2, h3] = LOWPASS_Q15.map(i32::from);

        let acc = h3 * tap(0)
            + h2 * (tap(6) + tap(1))
            + h1 * (tap(5) + tap(2))
            + h0 * (tap(4) + tap(3));

        self.index = (i + 1) % LOWPASS_TAPS;
        signed_saturate_rshift::<16, 15>(acc) as i16
    }

    /// Filter a block in place.
    pub fn process_block(&mut self, block: &mut [i16]) {
        for sample in block.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Zero the delay line.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Zero `x` when its magnitude is below `threshold`.
///
/// With `threshold = 500`: 499 and -499 become 0, 500 and -500 pass.
#[inline]
pub fn noise_gate(x: i16, threshold: u16) -> i16 {
    if x.unsigned_abs() < threshold {
        0
    } else {
        x
    }
}
