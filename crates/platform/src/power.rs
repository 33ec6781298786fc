//! Power management abstraction
//!
//! Sleep modes, the controller-visible power state, latched wake flags and
//! the [`WakeupHardware`] trait a chip implements so the sleep controller
//! can drive it.

use embassy_time::Duration;

use crate::gpio::{InterruptLine, PinId, TriggerMode};

/// Low-power mode depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepMode {
    /// Idle mode (CPU stopped, peripherals running)
    Idle,
    /// Sleep mode (CPU and most peripheral clocks stopped, RAM retained)
    #[default]
    Sleep,
    /// Deep sleep (only the wakeup logic and RAM retention stay powered)
    DeepSleep,
}

impl SleepMode {
    /// Short name used in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sleep => "sleep",
            Self::DeepSleep => "deep-sleep",
        }
    }
}

/// Controller power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Normal execution
    #[default]
    Awake,
    /// Halted in a low-power mode, waiting for a wakeup source
    Sleeping,
}

/// Wake flags latched by the hardware since the last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingWakeups {
    /// One bit per [`InterruptLine`], bit `n` for line `n`.
    pub lines: u32,
    /// The one-shot wake timer expired.
    pub timer: bool,
}

impl PendingWakeups {
    /// Nothing pending.
    pub const NONE: Self = Self {
        lines: 0,
        timer: false,
    };

    /// `true` when no line and no timer is pending.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines == 0 && !self.timer
    }

    /// Whether `line` is pending.
    #[must_use]
    pub const fn contains(&self, line: InterruptLine) -> bool {
        self.lines & line.mask() != 0
    }

    /// Keep only the lines selected by `mask`; the timer flag is untouched.
    #[must_use]
    pub const fn masked(self, mask: u32) -> Self {
        Self {
            lines: self.lines & mask,
            timer: self.timer,
        }
    }

    /// Highest-priority (lowest index) pending line.
    #[must_use]
    pub fn lowest_line(&self) -> Option<InterruptLine> {
        if self.lines == 0 {
            return None;
        }
        // trailing_zeros() < 32 whenever lines != 0
        InterruptLine::new(u8::try_from(self.lines.trailing_zeros()).ok()?)
    }

    /// Merge another snapshot into this one.
    pub fn merge(&mut self, other: Self) {
        self.lines |= other.lines;
        self.timer |= other.timer;
    }
}

/// Chip-side operations the sleep controller needs.
///
/// An implementation owns the external interrupt controller, the wake timer
/// and the core's low-power entry sequence. Interrupt handlers installed by
/// the implementation only latch flags; the controller reads them back with
/// [`WakeupHardware::take_pending`] and runs the matching callback.
pub trait WakeupHardware {
    /// Error type
    type Error: core::fmt::Debug;

    /// Interrupt line a pin is routed to, or `None` if the pin cannot
    /// generate an external interrupt.
    fn interrupt_line(&self, pin: PinId) -> Option<InterruptLine>;

    /// Route `pin` to `line` with the given trigger and unmask the line as a
    /// wakeup source. Reconfiguring an enabled line replaces its trigger.
    fn enable_wakeup(
        &mut self,
        pin: PinId,
        line: InterruptLine,
        trigger: TriggerMode,
    ) -> Result<(), Self::Error>;

    /// Mask `line` and drop any flag it has latched.
    fn disable_wakeup(&mut self, line: InterruptLine) -> Result<(), Self::Error>;

    /// Arm the one-shot wake timer to expire `after` from now.
    fn arm_timer(&mut self, after: Duration) -> Result<(), Self::Error>;

    /// Cancel the wake timer. No-op if it is not armed.
    fn disarm_timer(&mut self);

    /// Prepare the core for `mode` (clock gating, sleep-deep bits).
    fn enter_low_power(&mut self, mode: SleepMode);

    /// Undo [`WakeupHardware::enter_low_power`] after wake.
    fn exit_low_power(&mut self, mode: SleepMode);

    /// Halt until an interrupt is pending.
    ///
    /// Must check for already-latched flags with interrupts masked before
    /// halting, so a flag set between the caller's last check and the halt
    /// instruction is not lost. Returns immediately if anything is pending.
    fn wait_for_interrupt(&mut self) -> Result<(), Self::Error>;

    /// Read and clear every latched wake flag.
    fn take_pending(&mut self) -> PendingWakeups;
}

/// Wake-up source kind, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// GPIO pin interrupt
    Gpio(PinId),
    /// One-shot wake timer
    Timer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_line_picks_smallest_index() {
        let pending = PendingWakeups {
            lines: 0b1010_0000,
            timer: true,
        };
        assert_eq!(pending.lowest_line(), InterruptLine::new(5));
    }

    #[test]
    fn test_lowest_line_none_when_only_timer() {
        let pending = PendingWakeups {
            lines: 0,
            timer: true,
        };
        assert_eq!(pending.lowest_line(), None);
        assert!(!pending.is_empty());
    }

    #[test]
    fn test_masked_keeps_timer() {
        let pending = PendingWakeups {
            lines: 0b1111,
            timer: true,
        };
        let masked = pending.masked(0b0101);
        assert_eq!(masked.lines, 0b0101);
        assert!(masked.timer);
    }
}
