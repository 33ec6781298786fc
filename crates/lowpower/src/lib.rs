//! Sleep/wakeup coordination for microcontroller firmware
//!
//! [`SleepController`] owns a core's power state and a table of wakeup
//! sources, one per interrupt-capable pin. Firmware registers a callback per
//! pin, then calls [`SleepController::sleep`]; the core halts until a
//! registered source fires (or an optional timeout elapses), the matching
//! callback runs, and `sleep` returns a [`WakeReport`].
//!
//! ```text
//! attach_interrupt_wakeup(pin, cb, trigger) ──► source table ──► WakeupHardware
//!                                                      ▲               │
//! sleep(timeout) ── enter ── wait ── take_pending ─────┘               │
//!         ◄───────── exit ◄── dispatch cb (lowest line wins) ◄─────────┘
//! ```
//!
//! Callbacks share state with the main line through [`WakeCounter`] and
//! [`WakeFlag`], which are safe to touch from interrupt context.
//!
//! # Features
//!
//! - `std`: host builds
//! - `defmt`: log through `defmt` and derive `defmt::Format`
//! - `tracing`: log through `tracing` (host builds)

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
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod config;
pub mod controller;
pub mod error;
pub mod shared;
pub mod source;

pub use config::{ControllerConfig, UnwakeablePolicy};
pub use controller::{SleepController, SleepStats, WakeCause, WakeReport};
pub use error::{Error, Result};
pub use shared::{WakeCounter, WakeFlag};
pub use source::{HandlerFault, WakeupHandler, WakeupSource};
