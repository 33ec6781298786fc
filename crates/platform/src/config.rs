//! Platform-wide configuration constants
//!
//! Sizes of the fixed tables used by the wakeup hardware layer. Everything
//! here is compile-time; runtime knobs live with the sleep controller.

/// Number of external interrupt lines addressable by a pending-flags word.
pub const LINE_COUNT: usize = 32;

/// Number of simulated GPIO pins in the host mock.
pub const MOCK_PIN_COUNT: usize = 64;

/// Pins wired to an interrupt line by default in the host mock (`0..N` map
/// one-to-one onto lines `0..N`).
pub const MOCK_DEFAULT_LINES: u8 = 16;

/// Depth of the host mock's stimulus queue.
pub const MOCK_STIMULUS_DEPTH: usize = 32;
