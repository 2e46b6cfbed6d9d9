//! Fixed pipeline configuration.
//!
//! A [`PipelineConfig`] is consumed once by [`Pipeline::new`](crate::Pipeline::new)
//! and is immutable for the lifetime of the pipeline. Every task timeout is
//! derived from [`frame_period()`](PipelineConfig::frame_period).

use std::time::Duration;

use crate::constants::{
    ADC_BITS, BYTES_PER_SAMPLE, CALIBRATION_ATTEMPTS, CALIBRATION_BACKOFF_MS, FRAME_SAMPLES,
    MAX_POOL_DEPTH, NOISE_GATE_THRESHOLD, OUTPUT_CHANNELS, POOL_DEPTH, RING_FRAMES, SAMPLE_RATE,
    UNITY_GAIN_Q15,
};
use crate::dsp::CaptureFormat;
use crate::error::PipelineError;

/// Largest accepted mic gain: 8.0 in Q15.
const MAX_MIC_GAIN_Q15: i32 = 8 * UNITY_GAIN_Q15;

/// Configuration for the capture/radio/sink pipeline.
///
/// Use [`PipelineConfig::default()`] for the production settings, or
/// customize as needed:
///
/// ```
/// use karaoke_audio::{CaptureFormat, PipelineConfig};
///
/// let config = PipelineConfig {
///     capture_format: CaptureFormat::Unsigned { bits: 12 },
///     lowpass: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Capture slots per frame; the sink receives `frame_len` stereo samples per cycle.
    /// Default: 256
    pub frame_len: usize,

    /// Number of frame buffers in the capture pool (1..=32).
    /// Default: 8
    pub pool_depth: usize,

    /// Sample rate in Hz shared by every stage.
    /// Default: 44 100
    pub sample_rate: u32,

    /// Radio ring depth, measured in output frames.
    ///
    /// This is the radio latency budget: the ring holds exactly this many
    /// mixer cycles of stereo PCM before new chunks are dropped.
    /// Default: 16
    pub ring_frames: usize,

    /// How raw capture slots encode a sample.
    /// Default: left-justified, no offset
    pub capture_format: CaptureFormat,

    /// Q15 gain applied to every converted capture sample. 32768 = unity.
    /// Default: 32768
    pub mic_gain_q15: i32,

    /// Run capture samples through the 7-tap low-pass filter.
    /// Default: false
    pub lowpass: bool,

    /// Noise gate threshold on the 16-bit scale; 0 disables the gate.
    /// Default: 0
    pub noise_gate_threshold: u16,

    /// How long the mixer waits for radio data when the ring is empty.
    ///
    /// Must not exceed one frame period.
    /// Default: zero (never wait)
    pub radio_wait: Duration,

    /// Idle calibration read attempts before startup is aborted.
    /// Default: 10
    pub calibration_attempts: u32,

    /// Pause between idle calibration attempts.
    /// Default: 10ms
    pub calibration_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_len: FRAME_SAMPLES,
            pool_depth: POOL_DEPTH,
            sample_rate: SAMPLE_RATE,
            ring_frames: RING_FRAMES,
            capture_format: CaptureFormat::LeftJustified { msb_offset: 0 },
            mic_gain_q15: UNITY_GAIN_Q15,
            lowpass: false,
            noise_gate_threshold: 0,
            radio_wait: Duration::ZERO,
            calibration_attempts: CALIBRATION_ATTEMPTS,
            calibration_backoff: Duration::from_millis(u64::from(CALIBRATION_BACKOFF_MS)),
        }
    }
}

impl PipelineConfig {
    /// Settings for the analog iteration: 12-bit ADC, filtered and gated.
    pub fn analog_mic() -> Self {
        Self {
            capture_format: CaptureFormat::Unsigned { bits: ADC_BITS },
            lowpass: true,
            noise_gate_threshold: NOISE_GATE_THRESHOLD,
            ..Default::default()
        }
    }

    /// Nominal duration of one frame, the bound on every task wait.
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = self.frame_len as u128 * 1_000_000_000 / u128::from(self.sample_rate);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Number of interleaved `i16` values in one output frame.
    #[must_use]
    pub fn output_frame_samples(&self) -> usize {
        self.frame_len * OUTPUT_CHANNELS
    }

    /// Size in bytes of one output frame of stereo 16-bit PCM.
    #[must_use]
    pub fn output_frame_bytes(&self) -> usize {
        self.output_frame_samples() * BYTES_PER_SAMPLE
    }

    /// Usable byte capacity of the radio ring.
    #[must_use]
    pub fn ring_capacity_bytes(&self) -> usize {
        self.ring_frames * self.output_frame_bytes()
    }

    /// Worst-case delay a radio byte spends in a full ring.
    #[must_use]
    pub fn radio_latency(&self) -> Duration {
        self.frame_period() * u32::try_from(self.ring_frames).unwrap_or(u32::MAX)
    }

    /// Check every constraint the pipeline relies on.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.frame_len == 0 {
            return Err(PipelineError::invalid_config("frame_len must be non-zero"));
        }
        if self.pool_depth == 0 || self.pool_depth > MAX_POOL_DEPTH {
            return Err(PipelineError::invalid_config(format!(
                "pool_depth must be 1..={MAX_POOL_DEPTH}, got {}",
                self.pool_depth
            )));
        }
        if self.sample_rate == 0 {
            return Err(PipelineError::invalid_config("sample_rate must be non-zero"));
        }
        if self.ring_frames == 0 {
            return Err(PipelineError::invalid_config("ring_frames must be non-zero"));
        }
        match self.capture_format {
            CaptureFormat::Unsigned { bits } if bits == 0 || bits > 16 => {
                return Err(PipelineError::invalid_config(format!(
                    "unsigned capture width must be 1..=16 bits, got {bits}"
                )));
            }
            CaptureFormat::LeftJustified { msb_offset } if msb_offset > 15 => {
                return Err(PipelineError::invalid_config(format!(
                    "msb_offset must be 0..=15, got {msb_offset}"
                )));
            }
            _ => {}
        }
        if !(0..=MAX_MIC_GAIN_Q15).contains(&self.mic_gain_q15) {
            return Err(PipelineError::invalid_config(format!(
                "mic_gain_q15 must be 0..={MAX_MIC_GAIN_Q15}, got {}",
                self.mic_gain_q15
            )));
        }
        if self.radio_wait > self.frame_period() {
            return Err(PipelineError::invalid_config(format!(
                "radio_wait {:?} exceeds the frame period {:?}",
                self.radio_wait,
                self.frame_period()
            )));
        }
        if self.calibration_attempts == 0 {
            return Err(PipelineError::invalid_config(
                "calibration_attempts must be non-zero",
            ));
        }
        Ok(())
    }
}
