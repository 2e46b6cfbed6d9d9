//! Startup idle-value calibration.

use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::config::PipelineConfig;
use crate::dsp::{find_idle_value, CaptureFormat};
use crate::error::{DeviceError, PipelineError};
use crate::io::CaptureSource;

/// [`DelayNs`] backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Read one silent frame and return its average converter code.
///
/// Retries up to `config.calibration_attempts` times, pausing
/// `config.calibration_backoff` between attempts, and fails with
/// [`PipelineError::CalibrationFailed`] when every read fails. Formats that
/// need no idle reference return 0 without reading.
pub fn calibrate_idle<C, D>(
    capture: &mut C,
    config: &PipelineConfig,
    delay: &mut D,
) -> Result<u16, PipelineError>
where
    C: CaptureSource + ?Sized,
    D: DelayNs + ?Sized,
{
    let CaptureFormat::Unsigned { bits } = config.capture_format else {
        return Ok(0);
    };

    let timeout = config.frame_period();
    let backoff_ms = u32::try_from(config.calibration_backoff.as_millis()).unwrap_or(u32::MAX);
    let mut frame = vec![0i32; config.frame_len];
    let mut last = DeviceError::Timeout;

    for attempt in 1..=config.calibration_attempts {
        match capture.read(&mut frame, timeout) {
            Ok(()) => {
                let idle = find_idle_value(&frame, bits);
                tracing::debug!(attempt, idle, "calibration frame read");
                return Ok(idle);
            }
            Err(err) => {
                tracing::debug!(attempt, %err, "calibration read failed");
                last = err;
                if attempt < config.calibration_attempts {
                    delay.delay_ms(backoff_ms);
                }
            }
        }
    }

    Err(PipelineError::CalibrationFailed {
        attempts: config.calibration_attempts,
        last,
    })
}
