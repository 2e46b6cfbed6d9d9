/// Number of raw capture slots per frame (one mixer cycle).
pub const FRAME_SAMPLES: usize = 256;

/// Number of frame buffers in the capture pool.
pub const POOL_DEPTH: usize = 8;

/// Upper bound on pool depth: ownership is tracked in a 32-bit bitmap.
pub const MAX_POOL_DEPTH: usize = 32;

/// Audio sample rate in Hz, shared by capture, radio stream and sink.
pub const SAMPLE_RATE: u32 = 44_100;

/// Output channels written to the sink (interleaved L, R).
pub const OUTPUT_CHANNELS: usize = 2;

/// Bytes per 16-bit PCM sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Effective width of the SAR ADC converter code.
pub const ADC_BITS: u8 = 12;

/// Radio ring depth, in output frames.
pub const RING_FRAMES: usize = 16;

/// Noise gate threshold on the 16-bit scale.
pub const NOISE_GATE_THRESHOLD: u16 = 500;

/// Q15 unity gain (1.0).
pub const UNITY_GAIN_Q15: i32 = 1 << 15;

/// Idle calibration read attempts before startup is aborted.
pub const CALIBRATION_ATTEMPTS: u32 = 10;

/// Pause between idle calibration attempts, in milliseconds.
pub const CALIBRATION_BACKOFF_MS: u32 = 10;
