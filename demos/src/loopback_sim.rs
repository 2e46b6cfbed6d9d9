//! Loopback simulation: the full pipeline on the host, no hardware.
//!
//! A simulated 12-bit ADC produces a 440 Hz tone around its idle code, a
//! simulated radio peer streams a 220 Hz stereo tone in 1 KiB chunks, and a
//! simulated I2S amplifier reports the peak level it receives.
//!
//! ```text
//!   SimAdc ──► CaptureTask ──► busy ──► MixerTask ──► PeakSink
//!   radio thread ──► RadioIngress ══ ring ══╝
//! ```
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=karaoke_audio=debug cargo run -p karaoke-audio-demos --bin loopback_sim
//! ```

use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use karaoke_audio::{
    AudioSink, CaptureSource, DeviceError, Pipeline, PipelineConfig, PushOutcome, RadioIngress,
    SessionEvent, StdDelay,
};
use tracing_subscriber::EnvFilter;

const ADC_IDLE: f64 = 1800.0;
const RUN_TIME: Duration = Duration::from_secs(2);
const RADIO_CHUNK_BYTES: usize = 1024;

/// 12-bit SAR ADC paced at the frame period.
struct SimAdc {
    sample_rate: f64,
    phase: u64,
    next_frame: Instant,
    period: Duration,
    /// Stay silent for the first frames so calibration sees the idle code.
    quiet_frames: u32,
}

impl CaptureSource for SimAdc {
    fn read(&mut self, frame: &mut [i32], timeout: Duration) -> Result<(), DeviceError> {
        let wait = self.next_frame.saturating_duration_since(Instant::now());
        if wait > timeout {
            return Err(DeviceError::Timeout);
        }
        thread::sleep(wait);
        self.next_frame += self.period;

        for slot in frame.iter_mut() {
            let code = if self.quiet_frames > 0 {
                ADC_IDLE
            } else {
                let t = self.phase as f64 / self.sample_rate;
                ADC_IDLE + 1200.0 * (TAU * 440.0 * t).sin()
            };
            self.phase += 1;
            // Little-endian code in the low half of the slot.
            *slot = code as i32 & 0x0FFF;
        }
        self.quiet_frames = self.quiet_frames.saturating_sub(1);
        Ok(())
    }
}

/// I2S amplifier stand-in that tracks the output peak.
#[derive(Default)]
struct PeakSink {
    frames: u64,
    peak: i16,
}

impl AudioSink for PeakSink {
    fn write(&mut self, pcm: &[i16], _timeout: Duration) -> Result<(), DeviceError> {
        let peak = pcm.iter().map(|s| s.saturating_abs()).max().unwrap_or(0);
        self.peak = self.peak.max(peak);
        self.frames += 1;
        if self.frames % 100 == 0 {
            tracing::info!(frames = self.frames, peak = self.peak, "sink level");
            self.peak = 0;
        }
        Ok(())
    }
}

/// Simulated radio peer: connect, stream for a while, pause, resume.
fn radio_peer(mut radio: RadioIngress, sample_rate: u32, stop_at: Instant) {
    radio.session_state_changed(SessionEvent::Connected);
    radio.session_state_changed(SessionEvent::Playing);

    let pairs_per_chunk = RADIO_CHUNK_BYTES / 4;
    let chunk_period =
        Duration::from_secs_f64(pairs_per_chunk as f64 / f64::from(sample_rate));
    let mut phase = 0u64;
    let mut chunk = Vec::with_capacity(RADIO_CHUNK_BYTES);
    let mut dropped = 0u32;
    let pause_at = Instant::now() + RUN_TIME / 2;
    let mut paused = false;

    while Instant::now() < stop_at {
        if !paused && Instant::now() >= pause_at {
            radio.session_state_changed(SessionEvent::Paused);
            thread::sleep(Duration::from_millis(200));
            radio.session_state_changed(SessionEvent::Playing);
            paused = true;
        }

        chunk.clear();
        for _ in 0..pairs_per_chunk {
            let t = phase as f64 / f64::from(sample_rate);
            let s = (8000.0 * (TAU * 220.0 * t).sin()) as i16;
            chunk.extend_from_slice(&s.to_le_bytes());
            chunk.extend_from_slice(&s.to_le_bytes());
            phase += 1;
        }
        if radio.push(&chunk) == PushOutcome::Dropped {
            dropped += 1;
        }
        thread::sleep(chunk_period);
    }

    radio.session_state_changed(SessionEvent::Disconnected);
    tracing::info!(dropped, "radio peer disconnected");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = PipelineConfig::analog_mic();
    let period = config.frame_period();
    let sample_rate = config.sample_rate;

    let (pipeline, radio) = Pipeline::new(config)?;
    let shutdown = pipeline.shutdown_handle();

    let adc = SimAdc {
        sample_rate: f64::from(sample_rate),
        phase: 0,
        next_frame: Instant::now(),
        period,
        quiet_frames: 4,
    };

    let stop_at = Instant::now() + RUN_TIME;
    let peer = thread::Builder::new()
        .name("radio".into())
        .spawn(move || radio_peer(radio, sample_rate, stop_at))?;
    let timer = thread::spawn(move || {
        thread::sleep(RUN_TIME);
        shutdown.shutdown();
    });

    let stats = pipeline.run(adc, PeakSink::default(), StdDelay)?;

    let _ = timer.join();
    let _ = peer.join();

    println!();
    println!("Stats:");
    println!("  Frames captured:   {}", stats.frames_captured);
    println!("  Frames mixed:      {}", stats.frames_mixed);
    println!("  Busy misses:       {}", stats.busy_misses);
    println!("  Radio bytes in:    {}", stats.radio_bytes_accepted);
    println!("  Radio bytes mixed: {}", stats.radio_bytes_mixed);
    println!("  Radio drops:       {}", stats.radio_chunks_dropped);
    println!("  Sink writes:       {}", stats.sink_writes);
    println!("  Sink misses:       {}", stats.sink_misses);

    Ok(())
}
