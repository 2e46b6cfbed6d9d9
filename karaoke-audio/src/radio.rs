//! Radio stream ingress and session state.
//!
//! [`RadioIngress`] is handed to the wireless stack and called from its own
//! dispatch context: once per incoming audio chunk, and once per session
//! transition. Nothing on this path waits, allocates or logs.
//!
//! ```text
//! radio stack ──push(bytes)──► RingProducer ═══ ring ═══► RingConsumer ──► mixer
//!             ──session_state_changed──► SessionFlag ─────(read once per cycle)──►
//! ```

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::io::ring::{PushOutcome, RingProducer};
use crate::pipeline::stats::PipelineStats;

/// Radio session state as seen by the mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No peer connected.
    Idle = 0,
    /// Peer connected, stream paused.
    Paused = 1,
    /// Peer connected and streaming.
    Playing = 2,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            2 => SessionState::Playing,
            1 => SessionState::Paused,
            _ => SessionState::Idle,
        }
    }
}

/// Session transitions reported by the wireless stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A peer connected; a fresh stream is about to start.
    Connected,
    /// The peer went away.
    Disconnected,
    /// The peer started streaming audio.
    Playing,
    /// The peer suspended the stream.
    Paused,
}

/// Tri-state playing flag. Written only by [`RadioIngress`], read by the mixer.
#[derive(Debug)]
pub struct SessionFlag(AtomicU8);

impl SessionFlag {
    /// Create a flag in the [`SessionState::Idle`] state.
    pub const fn new() -> Self {
        SessionFlag(AtomicU8::new(SessionState::Idle as u8))
    }

    /// Current state.
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Whether the mixer should drain the radio ring this cycle.
    pub fn is_playing(&self) -> bool {
        self.get() == SessionState::Playing
    }

    fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for SessionFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry points for the wireless stack.
///
/// There is exactly one `RadioIngress` per pipeline. It is `Send` but every
/// method takes `&mut self`, so calls are serialized by whoever owns it,
/// normally the stack's single dispatch thread.
pub struct RadioIngress {
    producer: RingProducer,
    session: Arc<SessionFlag>,
    stats: Arc<PipelineStats>,
}

impl RadioIngress {
    pub(crate) fn new(
        producer: RingProducer,
        session: Arc<SessionFlag>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        RadioIngress {
            producer,
            session,
            stats,
        }
    }

    /// Offer one chunk of little-endian stereo PCM.
    ///
    /// Returns immediately. If the chunk does not fit in the ring it is
    /// dropped whole and the ring is left untouched.
    pub fn push(&mut self, chunk: &[u8]) -> PushOutcome {
        let outcome = self.producer.push(chunk);
        match outcome {
            PushOutcome::Accepted => self.stats.add_radio_accepted(chunk.len()),
            PushOutcome::Dropped => self.stats.inc_radio_dropped(),
        }
        outcome
    }

    /// Apply a session transition.
    ///
    /// A new connection discards whatever the previous session left in the
    /// ring and starts paused until the peer reports [`SessionEvent::Playing`].
    pub fn session_state_changed(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => {
                self.producer.request_reset();
                self.session.set(SessionState::Paused);
            }
            SessionEvent::Disconnected => self.session.set(SessionState::Idle),
            SessionEvent::Playing => self.session.set(SessionState::Playing),
            SessionEvent::Paused => self.session.set(SessionState::Paused),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.get()
    }

    /// Bytes the ring can accept right now.
    pub fn free_space(&self) -> usize {
        self.producer.free_space()
    }
}
