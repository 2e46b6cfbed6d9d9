use std::time::Duration;

use crate::error::DeviceError;

/// Hardware capture peripheral (microphone over I2S, or a SAR ADC).
///
/// Implementations wrap the driver layer; pin, clock and DMA setup happen
/// before the source is handed to the pipeline.
pub trait CaptureSource {
    /// Start the peripheral. Called once before calibration.
    fn enable(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Fill `frame` with raw capture slots, blocking up to `timeout`.
    ///
    /// A frame is either filled completely or the read fails; partial
    /// frames are reported as an error.
    fn read(&mut self, frame: &mut [i32], timeout: Duration) -> Result<(), DeviceError>;
}

/// Hardware audio sink (I2S amplifier / DAC).
pub trait AudioSink {
    /// Start the peripheral. Called once before the tasks run.
    fn enable(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Write interleaved stereo PCM (`L, R, L, R, ...`), blocking up to `timeout`.
    fn write(&mut self, pcm: &[i16], timeout: Duration) -> Result<(), DeviceError>;
}

impl<T: CaptureSource + ?Sized> CaptureSource for &mut T {
    fn enable(&mut self) -> Result<(), DeviceError> {
        (**self).enable()
    }

    fn read(&mut self, frame: &mut [i32], timeout: Duration) -> Result<(), DeviceError> {
        (**self).read(frame, timeout)
    }
}

impl<T: AudioSink + ?Sized> AudioSink for &mut T {
    fn enable(&mut self) -> Result<(), DeviceError> {
        (**self).enable()
    }

    fn write(&mut self, pcm: &[i16], timeout: Duration) -> Result<(), DeviceError> {
        (**self).write(pcm, timeout)
    }
}
