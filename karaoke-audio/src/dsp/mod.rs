//! Fixed-point DSP for the capture path.
//!
//! Everything here is a pure function except [`LowpassFilter`], whose delay
//! line is the only state carried between frames.

pub mod chain;
pub mod convert;
pub mod filter;
pub mod helpers;
pub mod intrinsics;

pub use chain::MicChain;
pub use convert::{
    convert_capture_sample, find_idle_value, left_justified_to_pcm, max_code, scale_to_output,
    slot_code, CaptureFormat,
};
pub use filter::{noise_gate, LowpassFilter, LOWPASS_Q15, LOWPASS_TAPS};
