//! Per-sample conditioning of raw capture frames.

use super::convert::{left_justified_to_pcm, scale_to_output, slot_code, CaptureFormat};
use super::filter::{noise_gate, LowpassFilter};
use super::helpers::apply_gain_q15;
use crate::config::PipelineConfig;
use crate::constants::UNITY_GAIN_Q15;

/// Capture-path signal chain: convert → scale → gain → low-pass → gate.
///
/// Owned by the mixer; the low-pass delay line is the only state and it
/// carries across frames.
#[derive(Debug, Clone)]
pub struct MicChain {
    format: CaptureFormat,
    idle: u16,
    gain_q15: i32,
    lowpass: Option<LowpassFilter>,
    gate_threshold: u16,
}

impl MicChain {
    /// Build the chain described by `config`, referenced to `idle`.
    ///
    /// `idle` is only used by [`CaptureFormat::Unsigned`].
    pub fn new(config: &PipelineConfig, idle: u16) -> Self {
        MicChain {
            format: config.capture_format,
            idle,
            gain_q15: config.mic_gain_q15,
            lowpass: config.lowpass.then(LowpassFilter::new),
            gate_threshold: config.noise_gate_threshold,
        }
    }

    /// The calibrated idle code this chain scales around.
    pub fn idle(&self) -> u16 {
        self.idle
    }

    /// Condition one raw capture slot into a 16-bit PCM sample.
    pub fn process(&mut self, slot: i32) -> i16 {
        let mut sample = match self.format {
            CaptureFormat::Unsigned { bits } => {
                scale_to_output(slot_code(slot, bits), self.idle, bits)
            }
            CaptureFormat::LeftJustified { msb_offset } => left_justified_to_pcm(slot, msb_offset),
        };
        if self.gain_q15 != UNITY_GAIN_Q15 {
            sample = apply_gain_q15(sample, self.gain_q15);
        }
        if let Some(filter) = self.lowpass.as_mut() {
            sample = filter.process(sample);
        }
        noise_gate(sample, self.gate_threshold)
    }

    /// Condition a whole frame into `out`.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `out` is as long as `frame`.
    pub fn process_frame(&mut self, frame: &[i32], out: &mut [i16]) {
        debug_assert_eq!(frame.len(), out.len());
        for (dst, &slot) in out.iter_mut().zip(frame) {
            *dst = self.process(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adc_config() -> PipelineConfig {
        PipelineConfig {
            capture_format: CaptureFormat::Unsigned { bits: 12 },
            ..Default::default()
        }
    }

    #[test]
    fn idle_frame_is_silent() {
        let mut chain = MicChain::new(&PipelineConfig::analog_mic(), 1800);
        let frame = vec![1800i32; 256];
        let mut out = vec![1i16; 256];
        chain.process_frame(&frame, &mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn unsigned_scales_around_idle() {
        let mut chain = MicChain::new(&adc_config(), 2048);
        assert_eq!(chain.process(4095), 32767);
        assert_eq!(chain.process(0), -32768);
        assert_eq!(chain.process(2048), 0);
    }

    #[test]
    fn left_justified_passthrough() {
        let mut chain = MicChain::new(&PipelineConfig::default(), 0);
        assert_eq!(chain.process(0x1234_0000), 0x1234);
        assert_eq!(chain.process(0xFFFE_0000_u32 as i32), -2);
    }

    #[test]
    fn gain_applies_before_gate() {
        let config = PipelineConfig {
            mic_gain_q15: UNITY_GAIN_Q15 / 2,
            noise_gate_threshold: 500,
            ..Default::default()
        };
        let mut chain = MicChain::new(&config, 0);
        // 1200 halves to 600 and passes; 900 halves to 450 and is gated.
        assert_eq!(chain.process(1200 << 16), 600);
        assert_eq!(chain.process(900 << 16), 0);
    }

    #[test]
    fn lowpass_state_carries_across_frames() {
        let config = PipelineConfig {
            lowpass: true,
            ..Default::default()
        };
        let mut split = MicChain::new(&config, 0);
        let mut whole = MicChain::new(&config, 0);

        let frame: Vec<i32> = (0..16).map(|i| (i * 1500 - 9000) << 16).collect();
        let mut expected = vec![0i16; 16];
        whole.process_frame(&frame, &mut expected);

        let mut first = vec![0i16; 8];
        let mut second = vec![0i16; 8];
        split.process_frame(&frame[..8], &mut first);
        split.process_frame(&frame[8..], &mut second);
        first.extend(second);
        assert_eq!(first, expected);
    }
}
