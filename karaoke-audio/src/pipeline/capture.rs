//! Capture task: free frame → hardware read → busy queue.

use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::DeviceError;
use crate::frame::FramePool;
use crate::io::CaptureSource;

use super::stats::PipelineStats;

/// What one capture step did with its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A filled frame was published to the busy queue.
    Published,
    /// No free frame within one frame period (the mixer is behind).
    NoFreeFrame,
    /// The read failed; the frame went back to the free queue.
    ReadFailed(DeviceError),
    /// The busy queue refused the frame; it went back to the free queue.
    ///
    /// Busy capacity equals pool depth, so a task holding a frame of its
    /// own pool always finds room. This arm is kept so a refused hand-off is
    /// still recycled and counted rather than lost.
    PublishFailed,
}

/// Fills pool frames from a [`CaptureSource`] and publishes them in order.
///
/// Holds at most one frame at a time, and only for the duration of a step.
pub struct CaptureTask<'p, C> {
    pool: &'p FramePool,
    source: C,
    stats: &'p PipelineStats,
    timeout: Duration,
}

impl<'p, C: CaptureSource> CaptureTask<'p, C> {
    /// Create a capture task; every wait is bounded by `frame_period`.
    pub fn new(
        pool: &'p FramePool,
        source: C,
        stats: &'p PipelineStats,
        frame_period: Duration,
    ) -> Self {
        CaptureTask {
            pool,
            source,
            stats,
            timeout: frame_period,
        }
    }

    /// Run one acquire → read → publish step.
    pub fn step(&mut self) -> CaptureOutcome {
        let Some(mut frame) = self.pool.acquire_free(self.timeout) else {
            self.stats.inc_pool_starved();
            tracing::debug!("capture: no free frame within one frame period");
            return CaptureOutcome::NoFreeFrame;
        };

        if let Err(err) = self.source.read(&mut frame, self.timeout) {
            self.stats.inc_capture_failure();
            tracing::debug!(slot = frame.slot(), %err, "capture: read failed, recycling frame");
            self.pool.release_free(frame);
            return CaptureOutcome::ReadFailed(err);
        }

        match self.pool.publish_busy(frame, self.timeout) {
            Ok(()) => {
                self.stats.inc_captured();
                CaptureOutcome::Published
            }
            Err(frame) => {
                self.stats.inc_publish_failure();
                tracing::warn!(slot = frame.slot(), "capture: busy queue refused frame, recycling");
                self.pool.release_free(frame);
                CaptureOutcome::PublishFailed
            }
        }
    }

    /// Step until `shutdown` is set. Each step returns within about three
    /// frame periods.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Acquire) {
            self.step();
        }
    }

    /// Give the capture source back.
    pub fn into_source(self) -> C {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedCapture;

    const PERIOD: Duration = Duration::from_millis(5);

    #[test]
    fn publishes_filled_frame() {
        let pool = FramePool::new(4, 8).unwrap();
        let stats = PipelineStats::default();
        let source = ScriptedCapture::constant(42);
        let mut task = CaptureTask::new(&pool, source, &stats, PERIOD);

        assert_eq!(task.step(), CaptureOutcome::Published);
        let frame = pool.take_busy(PERIOD).unwrap();
        assert!(frame.iter().all(|&w| w == 42));
        assert_eq!(stats.snapshot().frames_captured, 1);
    }

    #[test]
    fn failed_read_recycles_frame() {
        let pool = FramePool::new(4, 8).unwrap();
        let stats = PipelineStats::default();
        let source = ScriptedCapture::constant(1).fail_next(2, DeviceError::Timeout);
        let mut task = CaptureTask::new(&pool, source, &stats, PERIOD);

        assert_eq!(task.step(), CaptureOutcome::ReadFailed(DeviceError::Timeout));
        assert_eq!(task.step(), CaptureOutcome::ReadFailed(DeviceError::Timeout));
        let census = pool.census();
        assert_eq!(census.free, 4);
        assert_eq!(census.busy, 0);
        assert_eq!(census.held, 0);

        assert_eq!(task.step(), CaptureOutcome::Published);
        assert_eq!(stats.snapshot().capture_failures, 2);
    }

    #[test]
    fn never_forwards_a_failed_frame() {
        let pool = FramePool::new(2, 4).unwrap();
        let stats = PipelineStats::default();
        let source = ScriptedCapture::ramp().fail_next(1, DeviceError::Fault { code: 5 });
        let mut task = CaptureTask::new(&pool, source, &stats, PERIOD);

        task.step();
        task.step();
        // Only the successful read reached busy.
        assert_eq!(pool.census().busy, 1);
        let frame = pool.take_busy(PERIOD).unwrap();
        assert_eq!(&frame[..], &[1, 1, 1, 1]);
    }

    #[test]
    fn busy_at_capacity_leaks_nothing() {
        let pool = FramePool::new(3, 4).unwrap();
        let stats = PipelineStats::default();
        let mut task = CaptureTask::new(&pool, ScriptedCapture::ramp(), &stats, PERIOD);

        for _ in 0..3 {
            assert_eq!(task.step(), CaptureOutcome::Published);
        }
        assert_eq!(pool.census().busy, 3);

        // Every frame is waiting in busy: the next step stalls without
        // touching the free queue or the busy queue.
        assert_eq!(task.step(), CaptureOutcome::NoFreeFrame);
        let census = pool.census();
        assert_eq!((census.free, census.busy, census.held), (0, 3, 0));

        // Draining one busy frame lets capture continue.
        drop(pool.take_busy(PERIOD).unwrap());
        assert_eq!(task.step(), CaptureOutcome::Published);
        assert_eq!(pool.census().total(), 3);
        assert_eq!(stats.snapshot().pool_starved, 1);
    }

    #[test]
    fn publishes_in_capture_order() {
        let pool = FramePool::new(4, 2).unwrap();
        let stats = PipelineStats::default();
        let mut task = CaptureTask::new(&pool, ScriptedCapture::ramp(), &stats, PERIOD);
        for _ in 0..4 {
            task.step();
        }
        for expected in 0..4 {
            let frame = pool.take_busy(PERIOD).unwrap();
            assert_eq!(frame[0], expected);
        }
    }
}
