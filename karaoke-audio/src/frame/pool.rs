use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::constants::MAX_POOL_DEPTH;
use crate::error::PipelineError;

use super::token::FrameToken;

/// Fixed arena of capture frames, recycled through a free and a busy queue.
///
/// Every slot index lives in exactly one place at any time: the free queue,
/// the busy queue, or a live [`FrameToken`]. The queues carry bare slot
/// indices; a token is materialized only when a slot is received, and the
/// `held` bitmap records which slots currently have one.
pub struct FramePool {
    frame_len: usize,
    depth: usize,
    /// Bitmap: bit N = 1 means a `FrameToken` for slot N exists.
    held: AtomicU32,
    /// `depth * frame_len` raw capture words, slot-major.
    storage: Box<[UnsafeCell<i32>]>,
    free_tx: Sender<u8>,
    free_rx: Receiver<u8>,
    busy_tx: Sender<u8>,
    busy_rx: Receiver<u8>,
}

// SAFETY: The storage cells of a slot are only reachable through the unique
// `FrameToken` holding that slot. Slot indices move between owners through
// the channels, which provide the happens-before edge for the frame data.
unsafe impl Sync for FramePool {}

/// How the pool's slots are distributed at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCensus {
    /// Slots waiting in the free queue.
    pub free: usize,
    /// Slots waiting in the busy queue.
    pub busy: usize,
    /// Slots held by a task as a `FrameToken`.
    pub held: usize,
}

impl PoolCensus {
    /// Total slots accounted for.
    pub fn total(&self) -> usize {
        self.free + self.busy + self.held
    }
}

impl FramePool {
    /// Allocate `depth` frames of `frame_len` words and seed them all into
    /// the free queue. No allocation happens after this returns.
    pub fn new(depth: usize, frame_len: usize) -> Result<Self, PipelineError> {
        if depth == 0 || depth > MAX_POOL_DEPTH {
            return Err(PipelineError::invalid_config(format!(
                "pool depth must be 1..={MAX_POOL_DEPTH}, got {depth}"
            )));
        }
        if frame_len == 0 {
            return Err(PipelineError::invalid_config("frame length must be non-zero"));
        }

        let storage = (0..depth * frame_len).map(|_| UnsafeCell::new(0)).collect();
        let (free_tx, free_rx) = channel::bounded(depth);
        let (busy_tx, busy_rx) = channel::bounded(depth);

        for slot in 0..depth as u8 {
            // Capacity equals depth, so priming never waits.
            free_tx
                .try_send(slot)
                .map_err(|_| PipelineError::invalid_config("free queue rejected priming"))?;
        }

        Ok(FramePool {
            frame_len,
            depth,
            held: AtomicU32::new(0),
            storage,
            free_tx,
            free_rx,
            busy_tx,
            busy_rx,
        })
    }

    /// Words per frame.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Number of frames in the pool.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Take exclusive ownership of a free frame, waiting up to `timeout`.
    pub fn acquire_free(&self, timeout: Duration) -> Option<FrameToken<'_>> {
        let slot = self.free_rx.recv_timeout(timeout).ok()?;
        Some(self.claim(slot))
    }

    /// Return a frame to the free queue. Equivalent to dropping the token.
    ///
    /// A token always returns to the pool that issued it, even when it is
    /// released through another pool.
    pub fn release_free(&self, token: FrameToken<'_>) {
        if !self.owns(&token) {
            tracing::error!(slot = token.slot(), "frame released through a foreign pool");
        }
        drop(token);
    }

    /// Hand a filled frame to the busy queue, waiting up to `timeout` for room.
    ///
    /// On failure the token is handed back so the caller decides its fate;
    /// dropping it returns the frame to the free queue. A token issued by a
    /// different pool is refused and handed back untouched.
    pub fn publish_busy<'p>(
        &'p self,
        token: FrameToken<'p>,
        timeout: Duration,
    ) -> Result<(), FrameToken<'p>> {
        if !self.owns(&token) {
            tracing::error!(slot = token.slot(), "foreign frame refused by busy queue");
            return Err(token);
        }
        let slot = token.slot();
        // Clear ownership before the send: the consumer may claim the slot
        // as soon as it lands in the queue.
        self.unmark(slot);
        match self.busy_tx.send_timeout(slot, timeout) {
            Ok(()) => {
                core::mem::forget(token);
                Ok(())
            }
            Err(_) => {
                self.mark(slot);
                Err(token)
            }
        }
    }

    /// Take the oldest published frame, waiting up to `timeout`.
    pub fn take_busy(&self, timeout: Duration) -> Option<FrameToken<'_>> {
        let slot = self.busy_rx.recv_timeout(timeout).ok()?;
        Some(self.claim(slot))
    }

    /// Snapshot of where every slot currently is.
    ///
    /// Only exact while no task is mid-transfer; concurrent tasks may be
    /// observed half way through a hand-off.
    pub fn census(&self) -> PoolCensus {
        PoolCensus {
            free: self.free_rx.len(),
            busy: self.busy_rx.len(),
            held: self.held.load(Ordering::Acquire).count_ones() as usize,
        }
    }

    /// Called by `FrameToken::drop`.
    pub(super) fn recycle(&self, slot: u8) {
        self.unmark(slot);
        if self.free_tx.try_send(slot).is_err() {
            // Capacity equals depth and the slot was in no queue.
            tracing::error!(slot, "free queue rejected a returning frame");
        }
    }

    /// Pointer to the first word of `slot`.
    ///
    /// Valid for `frame_len` words. Only the holder of the slot's token may
    /// build a slice from it.
    pub(super) fn slot_ptr(&self, slot: u8) -> *mut i32 {
        let start = slot as usize * self.frame_len;
        debug_assert!(start + self.frame_len <= self.storage.len());
        UnsafeCell::raw_get(self.storage.as_ptr().wrapping_add(start))
    }

    fn owns(&self, token: &FrameToken<'_>) -> bool {
        core::ptr::eq(token.pool(), self)
    }

    fn claim(&self, slot: u8) -> FrameToken<'_> {
        self.mark(slot);
        FrameToken::new(self, slot)
    }

    fn mark(&self, slot: u8) {
        let old = self.held.fetch_or(1 << slot, Ordering::AcqRel);
        debug_assert!(old & (1 << slot) == 0, "slot {slot} claimed twice");
    }

    fn unmark(&self, slot: u8) {
        let old = self.held.fetch_and(!(1 << slot), Ordering::AcqRel);
        debug_assert!(old & (1 << slot) != 0, "slot {slot} released while unowned");
    }
}
