//! Hardware abstraction for low-power sleep/wakeup coordination
//!
//! This crate describes the chip-side half of the sleep controller: how pins
//! map onto external interrupt lines, which trigger policies exist, which
//! low-power modes a core offers, and the [`WakeupHardware`] trait that a
//! concrete chip implements.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (registers wakeup callbacks, calls sleep)
//!         ↓
//! lowpower::SleepController (power state, source table, dispatch)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Chip support (EIC / EXTI registers, WFI, wake timer)
//! ```
//!
//! # Features
//!
//! - `std`: Enable the host mocks outside of this crate's own tests
//! - `defmt`: Enable `defmt::Format` derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{PinId, TriggerMode, WakeupHardware};
//!
//! fn route_button<H: WakeupHardware>(hw: &mut H) -> Result<(), H::Error> {
//!     let pin = PinId::new(2);
//!     if let Some(line) = hw.interrupt_line(pin) {
//!         hw.enable_wakeup(pin, line, TriggerMode::Change)?;
//!     }
//!     Ok(())
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod gpio;
pub mod mocks;
pub mod power;

// Re-export GPIO types
pub use gpio::{InterruptLine, PinId, PinState, TriggerMode};

// Re-export power types
pub use power::{PendingWakeups, PowerState, SleepMode, WakeSource, WakeupHardware};
