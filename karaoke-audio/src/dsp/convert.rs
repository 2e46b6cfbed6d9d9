//! Raw capture slot conversion and idle-point scaling.
//!
//! Two converter families feed the pipeline:
//!
//! | Format | Slot contents | To 16-bit PCM |
//! |--------|---------------|---------------|
//! | [`CaptureFormat::Unsigned`] | little-endian byte pair in bits 0..16, low `bits` valid | [`scale_to_output`] around the calibrated idle code |
//! | [`CaptureFormat::LeftJustified`] | signed sample MSB-aligned in the 32-bit slot | shift left by the MSB offset, keep the top 16 bits |

use super::intrinsics::saturate16;

/// How a capture peripheral encodes samples in its 32-bit slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Unsigned converter code (SAR ADC). Needs idle calibration.
    Unsigned {
        /// Effective converter width, 1..=16.
        bits: u8,
    },
    /// Signed sample left-justified in the slot (I2S MEMS microphone).
    LeftJustified {
        /// Bit positions the sample MSB sits below bit 31.
        msb_offset: u8,
    },
}

impl CaptureFormat {
    /// Whether samples must be referenced to a calibrated idle code.
    pub fn needs_calibration(&self) -> bool {
        matches!(self, CaptureFormat::Unsigned { .. })
    }
}

/// Largest code an unsigned converter of `bits` width can produce.
#[inline]
pub fn max_code(bits: u8) -> u16 {
    if bits >= 16 {
        u16::MAX
    } else {
        (1u16 << bits) - 1
    }
}

/// Assemble a converter code from its two bytes and keep the low `bits`.
///
/// `convert_capture_sample(0xFF, 0xFF, 12) == 0x0FFF`.
#[inline]
pub fn convert_capture_sample(lo: u8, hi: u8, bits: u8) -> u16 {
    u16::from_le_bytes([lo, hi]) & max_code(bits)
}

/// Extract the unsigned converter code carried in a raw slot.
#[inline]
pub fn slot_code(slot: i32, bits: u8) -> u16 {
    let [lo, hi, _, _] = slot.to_le_bytes();
    convert_capture_sample(lo, hi, bits)
}

/// Convert a left-justified signed slot to 16-bit PCM.
///
/// The slot is shifted left by `msb_offset` to put the sample MSB at bit 31,
/// then arithmetic-shifted right 16, which sign-extends and drops the low bits.
#[inline]
pub fn left_justified_to_pcm(slot: i32, msb_offset: u8) -> i16 {
    ((slot << msb_offset) >> 16) as i16
}

/// Average converter code over one frame of slots.
///
/// Used once at startup, while the input is silent, as the zero reference
/// for [`scale_to_output`]. An empty frame yields 0.
pub fn find_idle_value(frame: &[i32], bits: u8) -> u16 {
    if frame.is_empty() {
        return 0;
    }
    let sum: u64 = frame.iter().map(|&slot| u64::from(slot_code(slot, bits))).sum();
    (sum / frame.len() as u64) as u16
}

/// Rescale an unsigned `bits`-wide code to signed 16-bit around `idle`.
///
/// Piecewise linear: codes above idle map onto `0..=32767` over
/// `idle..=max_code`, codes below map onto `-32768..0` over `0..idle`. The two
/// halves have different slopes because the idle point is rarely centered.
pub fn scale_to_output(sample: u16, idle: u16, bits: u8) -> i16 {
    let diff = i32::from(sample) - i32::from(idle);
    let scaled = if diff >= 0 {
        let span = i32::from(max_code(bits)) - i32::from(idle);
        if span <= 0 {
            return 0;
        }
        diff * 32767 / span
    } else {
        // idle > sample >= 0, so idle is non-zero here.
        diff * 32768 / i32::from(idle)
    };
    saturate16(scaled)
}
