//! Single-producer single-consumer byte ring for radio PCM.
//!
//! The producer side runs in the radio stack's dispatch context and must
//! never wait, so a chunk is either copied in whole or dropped whole. The
//! consumer side (the mixer) may wait for data up to a bounded timeout.
//!
//! # Ownership
//!
//! [`byte_ring()`] returns exactly one [`RingProducer`] and one
//! [`RingConsumer`]. Neither is `Clone`, and both wrap the matching
//! [`rtrb`] half, so the single-producer single-consumer contract is
//! enforced by the types.
//!
//! # Reset
//!
//! Both sides count bytes monotonically. A reset records the producer's
//! running total; the consumer later skips whatever part of that prefix it
//! has not read yet. A target the consumer already passed skips nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rtrb::{Consumer, Producer, RingBuffer};

/// `reset_to` value meaning "no reset requested".
const NO_RESET: u64 = u64::MAX;

/// Sleep between polls while the consumer waits for data.
const POLL_INTERVAL: Duration = Duration::from_micros(250);

/// Result of offering a chunk to the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The whole chunk was copied into the ring.
    Accepted,
    /// The chunk did not fit and was discarded; the ring is unchanged.
    Dropped,
}

/// Create a ring holding up to `capacity` bytes.
pub fn byte_ring(capacity: usize) -> (RingProducer, RingConsumer) {
    let (producer, consumer) = RingBuffer::<u8>::new(capacity);
    let reset_to = Arc::new(AtomicU64::new(NO_RESET));
    (
        RingProducer {
            inner: producer,
            capacity,
            pushed: 0,
            reset_to: Arc::clone(&reset_to),
        },
        RingConsumer {
            inner: consumer,
            capacity,
            popped: 0,
            reset_to,
        },
    )
}

/// Writing half of the ring. Never blocks.
pub struct RingProducer {
    inner: Producer<u8>,
    capacity: usize,
    /// Bytes accepted since creation.
    pushed: u64,
    /// Producer total the consumer should skip to, or `NO_RESET`.
    reset_to: Arc<AtomicU64>,
}

impl RingProducer {
    /// Usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can be pushed right now.
    ///
    /// A pending [`request_reset()`](Self::request_reset) is not reflected
    /// until the consumer applies it.
    pub fn free_space(&self) -> usize {
        self.inner.slots()
    }

    /// Copy `chunk` into the ring if it fits entirely, otherwise drop it.
    pub fn push(&mut self, chunk: &[u8]) -> PushOutcome {
        if chunk.is_empty() {
            return PushOutcome::Accepted;
        }
        let Ok(mut slots) = self.inner.write_chunk(chunk.len()) else {
            return PushOutcome::Dropped;
        };
        let (first, second) = slots.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&chunk[..split]);
        second.copy_from_slice(&chunk[split..]);
        slots.commit_all();

        self.pushed += chunk.len() as u64;
        PushOutcome::Accepted
    }

    /// Ask the consumer to discard everything pushed so far.
    ///
    /// The consumer applies the reset at the start of its next pop. Bytes
    /// pushed after this call are kept.
    pub fn request_reset(&mut self) {
        self.reset_to.store(self.pushed, Ordering::Release);
    }
}

/// Reading half of the ring.
pub struct RingConsumer {
    inner: Consumer<u8>,
    capacity: usize,
    /// Bytes read or skipped since creation.
    popped: u64,
    reset_to: Arc<AtomicU64>,
}

impl RingConsumer {
    /// Usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes waiting to be read, including any a pending reset will discard.
    pub fn len(&self) -> usize {
        self.inner.slots()
    }

    /// Whether no bytes are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a reset requested by the producer, if any.
    ///
    /// Returns `true` when a reset was pending. Only bytes the consumer has
    /// not read yet are skipped.
    pub fn apply_reset(&mut self) -> bool {
        let target = self.reset_to.swap(NO_RESET, Ordering::AcqRel);
        if target == NO_RESET {
            return false;
        }
        if target > self.popped {
            // The producer committed every byte up to `target` before
            // storing it, so they are all readable here.
            let stale = usize::try_from(target - self.popped).unwrap_or(usize::MAX);
            let skip = stale.min(self.inner.slots());
            if let Ok(chunk) = self.inner.read_chunk(skip) {
                chunk.commit_all();
                self.popped += skip as u64;
            }
        }
        true
    }

    /// Pop up to `dest.len()` bytes, in whole multiples of `granule`.
    ///
    /// If fewer than `granule` bytes are waiting, waits up to `timeout` for
    /// the producer. Returns the number of bytes written to `dest`.
    pub fn pop_into(&mut self, dest: &mut [u8], granule: usize, timeout: Duration) -> usize {
        let granule = granule.max(1);
        self.apply_reset();

        if self.inner.slots() < granule && !timeout.is_zero() {
            self.wait_for(granule, timeout);
            self.apply_reset();
        }
        self.read_granules(dest, granule)
    }

    fn read_granules(&mut self, dest: &mut [u8], granule: usize) -> usize {
        let len = self.inner.slots().min(dest.len()) / granule * granule;
        if len == 0 {
            return 0;
        }
        let Ok(chunk) = self.inner.read_chunk(len) else {
            return 0;
        };
        let (first, second) = chunk.as_slices();
        dest[..first.len()].copy_from_slice(first);
        dest[first.len()..len].copy_from_slice(second);
        chunk.commit_all();

        self.popped += len as u64;
        len
    }

    fn wait_for(&self, granule: usize, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while self.inner.slots() < granule {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}
