//! Capture frame arena and ownership hand-off.
//!
//! A fixed set of frames is allocated once. Frames move between the capture
//! task, the busy queue, the mixer and the free queue as [`FrameToken`]s;
//! holding the token is the only way to touch a frame's samples.

pub mod pool;
pub mod token;

pub use pool::{FramePool, PoolCensus};
pub use token::FrameToken;
