//! Scripted device doubles shared by the unit and integration tests.

use std::collections::VecDeque;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::error::DeviceError;
use crate::io::{AudioSink, CaptureSource};
use crate::pipeline::ShutdownHandle;

enum Fill {
    /// Every word of every frame is this value.
    Constant(i32),
    /// Every word of read N is N, counting failed reads too.
    Ramp,
    /// Read N is `slot << 16` for the Nth input, left-justified; the last
    /// value repeats.
    LeftJustified(Vec<i16>),
}

/// A [`CaptureSource`] that produces scripted frames.
pub struct ScriptedCapture {
    fill: Fill,
    reads: i32,
    failures: VecDeque<DeviceError>,
    enable_error: Option<DeviceError>,
    period: Duration,
}

impl ScriptedCapture {
    fn with_fill(fill: Fill) -> Self {
        ScriptedCapture {
            fill,
            reads: 0,
            failures: VecDeque::new(),
            enable_error: None,
            period: Duration::ZERO,
        }
    }

    pub fn constant(word: i32) -> Self {
        Self::with_fill(Fill::Constant(word))
    }

    pub fn ramp() -> Self {
        Self::with_fill(Fill::Ramp)
    }

    /// Frames of constant left-justified PCM, one value per read.
    pub fn pcm_sequence(samples: Vec<i16>) -> Self {
        Self::with_fill(Fill::LeftJustified(samples))
    }

    /// Fail the next `count` reads with `err`.
    pub fn fail_next(mut self, count: usize, err: DeviceError) -> Self {
        self.failures.extend(std::iter::repeat(err).take(count));
        self
    }

    /// Fail every read with `err`.
    pub fn always_fail(self, err: DeviceError) -> Self {
        self.fail_next(10_000, err)
    }

    pub fn fail_enable(mut self, err: DeviceError) -> Self {
        self.enable_error = Some(err);
        self
    }

    /// Sleep this long per read, like a real peripheral.
    pub fn paced(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn reads(&self) -> i32 {
        self.reads
    }
}

impl CaptureSource for ScriptedCapture {
    fn enable(&mut self) -> Result<(), DeviceError> {
        match self.enable_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read(&mut self, frame: &mut [i32], _timeout: Duration) -> Result<(), DeviceError> {
        let n = self.reads;
        self.reads += 1;
        if !self.period.is_zero() {
            std::thread::sleep(self.period);
        }
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        let word = match &self.fill {
            Fill::Constant(word) => *word,
            Fill::Ramp => n,
            Fill::LeftJustified(samples) => {
                let index = (n as usize).min(samples.len().saturating_sub(1));
                i32::from(samples.get(index).copied().unwrap_or(0)) << 16
            }
        };
        frame.fill(word);
        Ok(())
    }
}

/// An [`AudioSink`] that records every frame it accepts.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<Vec<i16>>,
    failures: VecDeque<DeviceError>,
    enable_error: Option<DeviceError>,
    stop_after: Option<(usize, ShutdownHandle)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(mut self, count: usize, err: DeviceError) -> Self {
        self.failures.extend(std::iter::repeat(err).take(count));
        self
    }

    pub fn fail_enable(mut self, err: DeviceError) -> Self {
        self.enable_error = Some(err);
        self
    }

    /// Request pipeline shutdown once `count` frames have been recorded.
    pub fn stop_after(mut self, count: usize, handle: ShutdownHandle) -> Self {
        self.stop_after = Some((count, handle));
        self
    }
}

impl AudioSink for RecordingSink {
    fn enable(&mut self) -> Result<(), DeviceError> {
        match self.enable_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn write(&mut self, pcm: &[i16], _timeout: Duration) -> Result<(), DeviceError> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.frames.push(pcm.to_vec());
        if let Some((count, handle)) = &self.stop_after {
            if self.frames.len() >= *count {
                handle.shutdown();
            }
        }
        Ok(())
    }
}

/// A [`DelayNs`] that records requested delays instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub total_ns: u64,
    pub calls: u32,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }
}

/// Little-endian bytes for a run of interleaved PCM samples.
pub fn le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
