//! State shared between wakeup callbacks and the main line.
//!
//! A callback runs while the main line is suspended inside `sleep`, on a
//! stack it does not own, with no lock available. Anything it writes and the
//! main line later reads goes through one of these cells.
//!
//! On targets with atomic read-modify-write (Cortex-M3 and up, RISC-V `A`)
//! the cells are plain atomics. On targets without it (Cortex-M0/M0+) they
//! fall back to a `critical_section::Mutex`, which masks interrupts for the
//! few instructions of each update.
//!
//! ```
//! use lowpower::WakeCounter;
//!
//! static WAKES: WakeCounter = WakeCounter::new();
//!
//! WAKES.increment();
//! assert_eq!(WAKES.get(), 1);
//! ```

#[cfg(target_has_atomic = "32")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(not(target_has_atomic = "32"))]
use core::cell::Cell;
#[cfg(not(target_has_atomic = "32"))]
use critical_section::Mutex;

/// Wrapping wake counter.
#[cfg(target_has_atomic = "32")]
#[derive(Debug)]
pub struct WakeCounter(AtomicU32);

/// Wrapping wake counter.
#[cfg(not(target_has_atomic = "32"))]
pub struct WakeCounter(Mutex<Cell<u32>>);

#[cfg(target_has_atomic = "32")]
impl WakeCounter {
    /// Counter starting at zero.
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter starting at `value`.
    pub const fn starting_at(value: u32) -> Self {
        Self(AtomicU32::new(value))
    }

    /// Add one, wrapping at `u32::MAX`.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Return the current value and reset to zero.
    pub fn take(&self) -> u32 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

#[cfg(not(target_has_atomic = "32"))]
impl WakeCounter {
    /// Counter starting at zero.
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter starting at `value`.
    pub const fn starting_at(value: u32) -> Self {
        Self(Mutex::new(Cell::new(value)))
    }

    /// Add one, wrapping at `u32::MAX`.
    pub fn increment(&self) {
        critical_section::with(|cs| {
            let cell = self.0.borrow(cs);
            cell.set(cell.get().wrapping_add(1));
        });
    }

    /// Current value.
    pub fn get(&self) -> u32 {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    /// Return the current value and reset to zero.
    pub fn take(&self) -> u32 {
        critical_section::with(|cs| self.0.borrow(cs).replace(0))
    }
}

/// One-bit "something happened" flag, set by a callback and consumed by the
/// main line.
#[cfg(target_has_atomic = "32")]
#[derive(Debug)]
pub struct WakeFlag(AtomicBool);

/// One-bit "something happened" flag, set by a callback and consumed by the
/// main line.
#[cfg(not(target_has_atomic = "32"))]
pub struct WakeFlag(Mutex<Cell<bool>>);

#[cfg(target_has_atomic = "32")]
impl WakeFlag {
    /// Cleared flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the flag.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag is raised, without clearing it.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[cfg(not(target_has_atomic = "32"))]
impl WakeFlag {
    /// Cleared flag.
    pub const fn new() -> Self {
        Self(Mutex::new(Cell::new(false)))
    }

    /// Raise the flag.
    pub fn set(&self) {
        critical_section::with(|cs| self.0.borrow(cs).set(true));
    }

    /// Whether the flag is raised, without clearing it.
    pub fn is_set(&self) -> bool {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    /// Clear the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.0.borrow(cs).replace(false))
    }
}

impl Default for WakeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increments_and_takes() {
        let counter = WakeCounter::new();
        counter.increment();
        counter.increment();
        assert_eq!(counter.get(), 2);
        assert_eq!(counter.take(), 2);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_counter_wraps() {
        let counter = WakeCounter::starting_at(u32::MAX);
        counter.increment();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_flag_take_clears() {
        let flag = WakeFlag::new();
        assert!(!flag.take());
        flag.set();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.is_set());
    }

    #[test]
    fn test_cells_are_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<WakeCounter>();
        assert_sync::<WakeFlag>();
    }
}
