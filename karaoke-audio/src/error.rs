//! Error types for the audio pipeline.
//!
//! Errors are split into two categories:
//! - **Per-cycle device results** ([`DeviceError`]): a capture read or sink
//!   write that missed its deadline or faulted. These are handled locally by
//!   the task that observed them and never cross a task boundary.
//! - **Fatal startup errors** ([`PipelineError`]): anything that prevents the
//!   pipeline from starting (bad configuration, device init, calibration).

use std::io;

/// Outcome of a single bounded capture read or sink write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The operation did not complete within its timeout.
    #[error("device timed out")]
    Timeout,

    /// The driver reported a failure.
    #[error("device fault (code {code})")]
    Fault {
        /// Driver-specific status code.
        code: i32,
    },
}

/// Which peripheral a [`PipelineError::DeviceInit`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// The hardware capture source (microphone / ADC).
    Capture,
    /// The hardware audio sink (I2S amplifier).
    Sink,
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRole::Capture => f.write_str("capture"),
            DeviceRole::Sink => f.write_str("sink"),
        }
    }
}

/// Fatal errors that prevent the pipeline from starting.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The configuration failed validation.
    #[error("invalid pipeline config: {reason}")]
    InvalidConfig {
        /// Which constraint was violated.
        reason: String,
    },

    /// A peripheral could not be enabled.
    #[error("{device} init failed: {source}")]
    DeviceInit {
        /// The peripheral that failed.
        device: DeviceRole,
        /// The driver error.
        #[source]
        source: DeviceError,
    },

    /// Idle-value calibration never obtained a complete frame.
    #[error("idle calibration failed after {attempts} attempts: {last}")]
    CalibrationFailed {
        /// Number of reads attempted.
        attempts: u32,
        /// Error from the final attempt.
        last: DeviceError,
    },

    /// A pipeline task thread could not be spawned.
    #[error("failed to spawn pipeline task: {0}")]
    TaskSpawn(#[from] io::Error),

    /// A pipeline task panicked while running.
    #[error("pipeline task '{task}' panicked")]
    TaskPanicked {
        /// Name of the task thread.
        task: &'static str,
    },
}

impl PipelineError {
    /// Creates an invalid-config error with the given reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
