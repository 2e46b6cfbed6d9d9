//! # karaoke-audio
//!
//! Real-time audio frame pipeline for a karaoke speaker: a microphone
//! capture path and a wireless audio stream are conditioned, mixed and
//! written to an I2S sink under a fixed per-frame deadline. The wireless
//! ingestion path never blocks, and no buffer is allocated after startup.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`frame`] | Fixed frame arena with free/busy queues and ownership tokens |
//! | Seams | [`io`] | `CaptureSource` / `AudioSink` traits, SPSC radio byte ring |
//! | Radio | [`radio`] | Non-blocking chunk ingress and session state |
//! | DSP | [`dsp`] | Converter scaling, Q15 gain, 7-tap low-pass, noise gate |
//! | Tasks | [`pipeline`] | Capture and mixer tasks, calibration, lifecycle |
//!
//! ## Quick start
//!
//! ```ignore
//! use karaoke_audio::{Pipeline, PipelineConfig, StdDelay};
//!
//! let (pipeline, mut radio) = Pipeline::new(PipelineConfig::analog_mic())?;
//! let shutdown = pipeline.shutdown_handle();
//!
//! // Hand `radio` to the wireless stack's dispatch thread:
//! //   radio.session_state_changed(SessionEvent::Connected);
//! //   radio.push(&chunk);
//!
//! let stats = pipeline.run(my_adc, my_i2s_amp, StdDelay)?;
//! ```
//!
//! ## Audio parameters
//!
//! - **Frame size:** 256 samples ([`constants::FRAME_SAMPLES`])
//! - **Sample rate:** 44 100 Hz ([`constants::SAMPLE_RATE`])
//! - **Output format:** interleaved stereo `i16`
//! - **Capture pool:** 8 frames ([`constants::POOL_DEPTH`])
//! - **Radio ring:** 16 output frames ([`constants::RING_FRAMES`])

pub mod config;
pub mod constants;
pub mod dsp;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod radio;

#[cfg(test)]
mod test_support;

pub use config::PipelineConfig;
pub use dsp::CaptureFormat;
pub use error::{DeviceError, DeviceRole, PipelineError};
pub use frame::{FramePool, FrameToken, PoolCensus};
pub use io::{AudioSink, CaptureSource, PushOutcome};
pub use pipeline::{Pipeline, PipelineStats, ShutdownHandle, StatsSnapshot, StdDelay};
pub use radio::{RadioIngress, SessionEvent, SessionState};
