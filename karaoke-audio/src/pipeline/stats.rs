use core::sync::atomic::{AtomicU64, Ordering};

/// Running counters shared by the tasks and the radio ingress.
///
/// All updates are `Relaxed`: the counters are for reporting only and never
/// order access to audio data.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_captured: AtomicU64,
    capture_failures: AtomicU64,
    pool_starved: AtomicU64,
    publish_failures: AtomicU64,
    frames_mixed: AtomicU64,
    busy_misses: AtomicU64,
    radio_bytes_accepted: AtomicU64,
    radio_chunks_dropped: AtomicU64,
    radio_bytes_mixed: AtomicU64,
    sink_writes: AtomicU64,
    sink_misses: AtomicU64,
    cycles: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Frames filled by the capture source and published.
    pub frames_captured: u64,
    /// Capture reads that timed out or faulted.
    pub capture_failures: u64,
    /// Times the capture task found no free frame within a frame period.
    pub pool_starved: u64,
    /// Filled frames that could not be published and were recycled.
    pub publish_failures: u64,
    /// Capture frames mixed into the output.
    pub frames_mixed: u64,
    /// Mixer cycles with no capture frame.
    pub busy_misses: u64,
    /// Radio bytes accepted into the ring.
    pub radio_bytes_accepted: u64,
    /// Radio chunks dropped because the ring was full.
    pub radio_chunks_dropped: u64,
    /// Radio bytes decoded into the output.
    pub radio_bytes_mixed: u64,
    /// Output frames written to the sink.
    pub sink_writes: u64,
    /// Output frames the sink rejected or timed out on.
    pub sink_misses: u64,
    /// Mixer cycles run.
    pub cycles: u64,
}

macro_rules! bump {
    ($($fn_name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl PipelineStats {
    bump! {
        inc_captured => frames_captured,
        inc_capture_failure => capture_failures,
        inc_pool_starved => pool_starved,
        inc_publish_failure => publish_failures,
        inc_mixed => frames_mixed,
        inc_busy_miss => busy_misses,
        inc_radio_dropped => radio_chunks_dropped,
        inc_sink_write => sink_writes,
        inc_sink_miss => sink_misses,
        inc_cycle => cycles,
    }

    pub(crate) fn add_radio_accepted(&self, bytes: usize) {
        self.radio_bytes_accepted
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_radio_mixed(&self, bytes: usize) {
        self.radio_bytes_mixed
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Number of radio chunks dropped so far.
    pub fn radio_chunks_dropped(&self) -> u64 {
        self.radio_chunks_dropped.load(Ordering::Relaxed)
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames_captured: load(&self.frames_captured),
            capture_failures: load(&self.capture_failures),
            pool_starved: load(&self.pool_starved),
            publish_failures: load(&self.publish_failures),
            frames_mixed: load(&self.frames_mixed),
            busy_misses: load(&self.busy_misses),
            radio_bytes_accepted: load(&self.radio_bytes_accepted),
            radio_chunks_dropped: load(&self.radio_chunks_dropped),
            radio_bytes_mixed: load(&self.radio_bytes_mixed),
            sink_writes: load(&self.sink_writes),
            sink_misses: load(&self.sink_misses),
            cycles: load(&self.cycles),
        }
    }
}
