//! Mixer/sink task: radio ring + busy frame → stereo output → sink.
//!
//! ## Cycle
//!
//! ```text
//! 1. apply a pending ring reset, clear the output frame
//! 2. playing?  pop whole stereo frames from the ring, decode into output
//! 3. busy frame within one period?  condition it, recycle it, add to both channels
//! 4. write output to the sink within one period
//! ```
//!
//! Neither source is ever waited on for longer than one frame period, so a
//! stalled producer costs quality, never the cycle.

use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::constants::{BYTES_PER_SAMPLE, OUTPUT_CHANNELS};
use crate::dsp::MicChain;
use crate::frame::FramePool;
use crate::io::interleave::{decode_le_pcm, mix_mono_into_stereo, silence};
use crate::io::ring::RingConsumer;
use crate::io::AudioSink;
use crate::radio::SessionFlag;

use super::stats::PipelineStats;

/// Bytes in one interleaved stereo sample pair. The ring is drained in
/// multiples of this so channels never swap.
const STEREO_FRAME_BYTES: usize = OUTPUT_CHANNELS * BYTES_PER_SAMPLE;

/// What one mixer cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Radio bytes decoded into the output frame.
    pub radio_bytes: usize,
    /// Whether a capture frame was mixed in.
    pub capture_mixed: bool,
    /// Whether the sink accepted the output frame.
    pub sink_written: bool,
}

/// Builds one output frame per cycle and writes it to an [`AudioSink`].
pub struct MixerTask<'p, S> {
    pool: &'p FramePool,
    ring: RingConsumer,
    session: &'p SessionFlag,
    chain: MicChain,
    sink: S,
    stats: &'p PipelineStats,
    frame_period: Duration,
    radio_wait: Duration,
    /// Interleaved stereo output, `frame_len * 2` samples.
    output: Vec<i16>,
    /// Conditioned capture samples, `frame_len` samples.
    mono: Vec<i16>,
    /// Raw ring bytes, one output frame.
    scratch: Vec<u8>,
    last_dropped: u64,
}

impl<'p, S: AudioSink> MixerTask<'p, S> {
    /// Create the mixer. All buffers are allocated here, never per cycle.
    pub fn new(
        pool: &'p FramePool,
        ring: RingConsumer,
        session: &'p SessionFlag,
        chain: MicChain,
        sink: S,
        stats: &'p PipelineStats,
        config: &PipelineConfig,
    ) -> Self {
        MixerTask {
            pool,
            ring,
            session,
            chain,
            sink,
            stats,
            frame_period: config.frame_period(),
            radio_wait: config.radio_wait,
            output: vec![0; config.output_frame_samples()],
            mono: vec![0; config.frame_len],
            scratch: vec![0; config.output_frame_bytes()],
            last_dropped: stats.radio_chunks_dropped(),
        }
    }

    /// Run one output-frame cycle.
    pub fn cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        self.ring.apply_reset();
        silence(&mut self.output);

        // The flag is sampled once; a transition mid-cycle takes effect next cycle.
        if self.session.is_playing() {
            let n = self
                .ring
                .pop_into(&mut self.scratch, STEREO_FRAME_BYTES, self.radio_wait);
            if n > 0 {
                decode_le_pcm(&self.scratch[..n], &mut self.output);
                self.stats.add_radio_mixed(n);
            }
            report.radio_bytes = n;
        }

        match self.pool.take_busy(self.frame_period) {
            Some(frame) => {
                self.chain.process_frame(&frame, &mut self.mono);
                self.pool.release_free(frame);
                mix_mono_into_stereo(&mut self.output, &self.mono);
                self.stats.inc_mixed();
                report.capture_mixed = true;
            }
            None => {
                self.stats.inc_busy_miss();
                tracing::debug!("mixer: no capture frame this cycle");
            }
        }

        match self.sink.write(&self.output, self.frame_period) {
            Ok(()) => {
                self.stats.inc_sink_write();
                report.sink_written = true;
            }
            Err(err) => {
                self.stats.inc_sink_miss();
                tracing::warn!(%err, "mixer: sink write missed");
            }
        }

        let dropped = self.stats.radio_chunks_dropped();
        if dropped > self.last_dropped {
            tracing::debug!(
                new = dropped - self.last_dropped,
                total = dropped,
                "mixer: radio chunks dropped on full ring"
            );
            self.last_dropped = dropped;
        }

        self.stats.inc_cycle();
        report
    }

    /// Cycle until `shutdown` is set.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Acquire) {
            self.cycle();
        }
    }

    /// The output frame built by the last cycle.
    pub fn output(&self) -> &[i16] {
        &self.output
    }

    /// Give the sink back.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::DeviceError;
    use crate::io::ring::{byte_ring, RingProducer};
    use crate::radio::{RadioIngress, SessionEvent};
    use crate::test_support::{le_bytes, RecordingSink};

    const FRAME_LEN: usize = 4;

    fn config() -> PipelineConfig {
        PipelineConfig {
            frame_len: FRAME_LEN,
            pool_depth: 4,
            sample_rate: 1_000,
            ring_frames: 4,
            ..Default::default()
        }
    }

    struct Rig {
        pool: FramePool,
        session: Arc<SessionFlag>,
        stats: Arc<PipelineStats>,
    }

    impl Rig {
        fn new() -> Self {
            Rig {
                pool: FramePool::new(4, FRAME_LEN).unwrap(),
                session: Arc::new(SessionFlag::new()),
                stats: Arc::new(PipelineStats::default()),
            }
        }

        fn radio(&self, producer: RingProducer) -> RadioIngress {
            RadioIngress::new(producer, Arc::clone(&self.session), Arc::clone(&self.stats))
        }

        fn mixer<'a>(
            &'a self,
            ring: RingConsumer,
            sink: &'a mut RecordingSink,
        ) -> MixerTask<'a, &'a mut RecordingSink> {
            let config = config();
            let chain = MicChain::new(&config, 0);
            MixerTask::new(&self.pool, ring, &self.session, chain, sink, &self.stats, &config)
        }

        fn publish_pcm(&self, sample: i16) {
            let mut frame = self.pool.acquire_free(Duration::ZERO).unwrap();
            frame.fill(i32::from(sample) << 16);
            self.pool.publish_busy(frame, Duration::ZERO).unwrap();
        }
    }

    #[test]
    fn no_sources_writes_silence() {
        let rig = Rig::new();
        let (_tx, rx) = byte_ring(config().ring_capacity_bytes());
        let mut sink = RecordingSink::new();
        let mut mixer = rig.mixer(rx, &mut sink);

        let report = mixer.cycle();
        assert!(!report.capture_mixed);
        assert!(report.sink_written);
        drop(mixer);
        assert_eq!(sink.frames, vec![vec![0i16; FRAME_LEN * 2]]);
        assert_eq!(rig.stats.snapshot().busy_misses, 1);
    }

    #[test]
    fn capture_rendered_on_both_channels() {
        let rig = Rig::new();
        let (_tx, rx) = byte_ring(config().ring_capacity_bytes());
        let mut sink = RecordingSink::new();
        let mut mixer = rig.mixer(rx, &mut sink);

        rig.publish_pcm(1234);
        assert!(mixer.cycle().capture_mixed);
        assert_eq!(mixer.output(), &[1234; FRAME_LEN * 2]);
        // The frame went straight back to the free queue.
        assert_eq!(rig.pool.census().free, 4);
    }

    #[test]
    fn radio_and_capture_mix_with_saturation() {
        let rig = Rig::new();
        let (tx, rx) = byte_ring(config().ring_capacity_bytes());
        let mut radio = rig.radio(tx);
        let mut sink = RecordingSink::new();
        let mut mixer = rig.mixer(rx, &mut sink);

        radio.session_state_changed(SessionEvent::Connected);
        radio.session_state_changed(SessionEvent::Playing);
        radio.push(&le_bytes(&[100, -100, 32_000, -32_000, 0, 0, 5, 6]));
        rig.publish_pcm(1000);

        let report = mixer.cycle();
        assert_eq!(report.radio_bytes, 16);
        assert_eq!(
            mixer.output(),
            &[1100, 900, i16::MAX, -31_000, 1000, 1000, 1005, 1006]
        );
    }

    #[test]
    fn paused_session_leaves_ring_untouched() {
        let rig = Rig::new();
        let (tx, rx) = byte_ring(config().ring_capacity_bytes());
        let mut radio = rig.radio(tx);
        let mut sink = RecordingSink::new();
        let mut mixer = rig.mixer(rx, &mut sink);

        radio.session_state_changed(SessionEvent::Connected);
        radio.push(&le_bytes(&[7; 8]));
        let before = radio.free_space();

        rig.publish_pcm(-50);
        let report = mixer.cycle();
        assert_eq!(report.radio_bytes, 0);
        assert_eq!(mixer.output(), &[-50; FRAME_LEN * 2]);
        assert_eq!(radio.free_space(), before);

        radio.session_state_changed(SessionEvent::Playing);
        assert_eq!(mixer.cycle().radio_bytes, 16);
        assert_eq!(mixer.output(), &[7; FRAME_LEN * 2]);
    }

    #[test]
    fn partial_radio_frame_keeps_channel_alignment() {
        let rig = Rig::new();
        let (tx, rx) = byte_ring(config().ring_capacity_bytes());
        let mut radio = rig.radio(tx);
        let mut sink = RecordingSink::new();
        let mut mixer = rig.mixer(rx, &mut sink);

        radio.session_state_changed(SessionEvent::Playing);
        // One and a half stereo pairs.
        radio.push(&[1, 0, 2, 0, 3, 0]);
        assert_eq!(mixer.cycle().radio_bytes, 4);
        assert_eq!(&mixer.output()[..4], &[1, 2, 0, 0]);

        radio.push(&[4, 0]);
        assert_eq!(mixer.cycle().radio_bytes, 4);
        assert_eq!(&mixer.output()[..4], &[3, 4, 0, 0]);
    }

    #[test]
    fn reconnect_discards_previous_session_audio() {
        let rig = Rig::new();
        let (tx, rx) = byte_ring(config().ring_capacity_bytes());
        let mut radio = rig.radio(tx);
        let mut sink = RecordingSink::new();
        let mut mixer = rig.mixer(rx, &mut sink);

        radio.session_state_changed(SessionEvent::Playing);
        radio.push(&le_bytes(&[9; 8]));
        radio.session_state_changed(SessionEvent::Connected);
        radio.session_state_changed(SessionEvent::Playing);

        assert_eq!(mixer.cycle().radio_bytes, 0);
        assert!(mixer.output().iter().all(|&s| s == 0));
    }

    #[test]
    fn sink_miss_is_not_fatal() {
        let rig = Rig::new();
        let (_tx, rx) = byte_ring(config().ring_capacity_bytes());
        let mut sink = RecordingSink::new().fail_next(1, DeviceError::Timeout);
        let mut mixer = rig.mixer(rx, &mut sink);

        rig.publish_pcm(1);
        rig.publish_pcm(2);
        assert!(!mixer.cycle().sink_written);
        assert!(mixer.cycle().sink_written);
        drop(mixer);

        assert_eq!(sink.frames, vec![vec![2i16; FRAME_LEN * 2]]);
        let snap = rig.stats.snapshot();
        assert_eq!(snap.sink_misses, 1);
        assert_eq!(snap.sink_writes, 1);
        assert_eq!(snap.frames_mixed, 2);
        assert_eq!(rig.pool.census().free, 4);
    }
}
