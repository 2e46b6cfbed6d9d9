//! The pipeline context and its two tasks.
//!
//! ```text
//!            ┌──────────── free queue ◄───────────────┐
//!            ▼                                         │
//! CaptureSource ──► CaptureTask ──► busy queue ──► MixerTask ──► AudioSink
//!                                                      ▲
//! radio stack ──► RadioIngress ══ byte ring ══════════╝
//! ```
//!
//! [`Pipeline::new`] allocates every buffer up front and hands back the
//! [`RadioIngress`] for the wireless stack. [`Pipeline::run`] enables the
//! devices, calibrates, then runs the capture and mixer tasks on their own
//! threads until a [`ShutdownHandle`] stops them.

pub mod calibrate;
pub mod capture;
pub mod mixer;
pub mod stats;

pub use calibrate::{calibrate_idle, StdDelay};
pub use capture::{CaptureOutcome, CaptureTask};
pub use mixer::{CycleReport, MixerTask};
pub use stats::{PipelineStats, StatsSnapshot};

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use embedded_hal::delay::DelayNs;

use crate::config::PipelineConfig;
use crate::dsp::MicChain;
use crate::error::{DeviceRole, PipelineError};
use crate::frame::FramePool;
use crate::io::ring::{byte_ring, RingConsumer};
use crate::io::{AudioSink, CaptureSource};
use crate::radio::{RadioIngress, SessionFlag};

/// Stops a running [`Pipeline`]. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask both tasks to stop. They notice within one cycle.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Raises the shutdown flag if a task unwinds, so its peer stops too.
struct StopOnPanic<'a>(&'a AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

/// Everything the tasks share, built once at startup.
pub struct Pipeline {
    config: PipelineConfig,
    pool: FramePool,
    ring: RingConsumer,
    session: Arc<SessionFlag>,
    stats: Arc<PipelineStats>,
    shutdown: Arc<AtomicBool>,
}

impl Pipeline {
    /// Validate `config` and allocate the pool, queues and ring.
    ///
    /// Returns the pipeline and the single [`RadioIngress`] feeding it.
    pub fn new(config: PipelineConfig) -> Result<(Self, RadioIngress), PipelineError> {
        config.validate()?;

        let pool = FramePool::new(config.pool_depth, config.frame_len)?;
        let (producer, ring) = byte_ring(config.ring_capacity_bytes());
        let session = Arc::new(SessionFlag::new());
        let stats = Arc::new(PipelineStats::default());
        let radio = RadioIngress::new(producer, Arc::clone(&session), Arc::clone(&stats));

        tracing::info!(
            frame_len = config.frame_len,
            pool_depth = config.pool_depth,
            sample_rate = config.sample_rate,
            ring_bytes = config.ring_capacity_bytes(),
            latency_ms = config.radio_latency().as_millis() as u64,
            "pipeline allocated"
        );

        let pipeline = Pipeline {
            config,
            pool,
            ring,
            session,
            stats,
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        Ok((pipeline, radio))
    }

    /// The configuration this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared counters, readable while the pipeline runs.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// The capture frame pool.
    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// A handle that stops [`run`](Self::run) from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Enable both devices, calibrate, and run the tasks until shutdown.
    ///
    /// Blocks the calling thread. Returns the final counters once both tasks
    /// have stopped, or the startup error that kept them from starting.
    pub fn run<C, S, D>(
        self,
        mut capture: C,
        mut sink: S,
        mut delay: D,
    ) -> Result<StatsSnapshot, PipelineError>
    where
        C: CaptureSource + Send,
        S: AudioSink + Send,
        D: DelayNs,
    {
        let Pipeline {
            config,
            pool,
            ring,
            session,
            stats,
            shutdown,
        } = self;

        capture.enable().map_err(|source| PipelineError::DeviceInit {
            device: DeviceRole::Capture,
            source,
        })?;
        sink.enable().map_err(|source| PipelineError::DeviceInit {
            device: DeviceRole::Sink,
            source,
        })?;

        let idle = if config.capture_format.needs_calibration() {
            let idle = calibrate_idle(&mut capture, &config, &mut delay)?;
            tracing::info!(idle, "capture idle value calibrated");
            idle
        } else {
            0
        };

        let period = config.frame_period();
        let mut capture_task = CaptureTask::new(&pool, capture, &stats, period);
        let chain = MicChain::new(&config, idle);
        let mut mixer = MixerTask::new(&pool, ring, &session, chain, sink, &stats, &config);
        let stop: &AtomicBool = &shutdown;

        tracing::info!(frame_period_us = period.as_micros() as u64, "pipeline starting");

        thread::scope(|scope| -> Result<(), PipelineError> {
            let capture_handle = thread::Builder::new()
                .name("capture".into())
                .spawn_scoped(scope, move || {
                    let _guard = StopOnPanic(stop);
                    capture_task.run(stop);
                })?;

            let mixer_handle = match thread::Builder::new()
                .name("mixer".into())
                .spawn_scoped(scope, move || {
                    let _guard = StopOnPanic(stop);
                    mixer.run(stop);
                }) {
                Ok(handle) => handle,
                Err(err) => {
                    // Let the capture thread wind down before the scope joins it.
                    stop.store(true, Ordering::Release);
                    return Err(err.into());
                }
            };

            let capture_result = capture_handle.join();
            let mixer_result = mixer_handle.join();
            capture_result.map_err(|_| PipelineError::TaskPanicked { task: "capture" })?;
            mixer_result.map_err(|_| PipelineError::TaskPanicked { task: "mixer" })?;
            Ok(())
        })?;

        let snapshot = stats.snapshot();
        tracing::info!(
            captured = snapshot.frames_captured,
            mixed = snapshot.frames_mixed,
            sink_writes = snapshot.sink_writes,
            sink_misses = snapshot.sink_misses,
            radio_dropped = snapshot.radio_chunks_dropped,
            "pipeline stopped"
        );
        Ok(snapshot)
    }
}
