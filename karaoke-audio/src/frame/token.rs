use core::fmt;
use core::ops::{Deref, DerefMut};

use super::pool::FramePool;

/// Exclusive handle to one frame of the [`FramePool`].
///
/// There is at most one `FrameToken` per slot, and holding it is the only way
/// to read or write the frame. Moving the token moves ownership; no data is
/// copied. Dropping a token returns its frame to the free queue, so a frame
/// abandoned on any error path is recycled rather than leaked.
pub struct FrameToken<'p> {
    pool: &'p FramePool,
    slot: u8,
}

impl<'p> FrameToken<'p> {
    /// The caller must have just taken `slot` out of a pool queue.
    pub(super) fn new(pool: &'p FramePool, slot: u8) -> Self {
        FrameToken { pool, slot }
    }

    /// Arena slot index of this frame.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub(super) fn pool(&self) -> &'p FramePool {
        self.pool
    }
}

impl Deref for FrameToken<'_> {
    type Target = [i32];

    fn deref(&self) -> &Self::Target {
        // SAFETY: We hold the unique token for this slot, and `&self` keeps
        // any mutable view from coexisting with this one.
        unsafe {
            core::slice::from_raw_parts(self.pool.slot_ptr(self.slot), self.pool.frame_len())
        }
    }
}

impl DerefMut for FrameToken<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: We hold the unique token for this slot, borrowed mutably.
        unsafe {
            core::slice::from_raw_parts_mut(self.pool.slot_ptr(self.slot), self.pool.frame_len())
        }
    }
}

impl Drop for FrameToken<'_> {
    fn drop(&mut self) {
        self.pool.recycle(self.slot);
    }
}

impl fmt::Debug for FrameToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameToken").field("slot", &self.slot).finish()
    }
}
