//! Device seams and the radio byte ring.
//!
//! ## Components
//!
//! | Item | Side | Description |
//! |------|------|-------------|
//! | [`CaptureSource`] | input | Bounded read of one raw capture frame |
//! | [`AudioSink`] | output | Bounded write of one interleaved stereo frame |
//! | [`ring`] | radio → mixer | Lock-free SPSC byte ring, drop-whole on overflow |
//! | [`interleave`] | mixer | LE PCM decoding, mono → stereo saturating mix |

pub mod device;
pub mod interleave;
pub mod ring;

pub use device::{AudioSink, CaptureSource};
pub use ring::{byte_ring, PushOutcome, RingConsumer, RingProducer};
