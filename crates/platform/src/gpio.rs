//! GPIO identifiers and interrupt trigger configuration
//!
//! Provides the pin-side vocabulary shared by the wakeup hardware layer and
//! the sleep controller.

use core::fmt;

use crate::config::LINE_COUNT;

/// Physical GPIO pin number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct PinId(u8);

impl PinId {
    /// Wrap a raw pin number.
    #[must_use]
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// Return the raw pin number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl From<u8> for PinId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External interrupt controller line.
///
/// The numeric value doubles as the line's priority: when several lines are
/// pending at once, the lowest index is serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct InterruptLine(u8);

impl InterruptLine {
    /// Create a line, returning `None` when `index >= LINE_COUNT`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < LINE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Return the line index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Single-bit mask selecting this line in a pending-flags word.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match 1u32.checked_shl(self.0 as u32) {
            Some(bit) => bit,
            None => 0,
        }
    }
}

impl fmt::Display for InterruptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EXTINT{}", self.0)
    }
}

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    #[default]
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// Wakeup trigger policy for an external interrupt line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerMode {
    /// Trigger on a low-to-high transition
    Rising,
    /// Trigger on a high-to-low transition
    Falling,
    /// Trigger on any transition
    Change,
    /// Trigger while the pin is held low
    Low,
    /// Trigger while the pin is held high
    High,
}

impl TriggerMode {
    /// `true` for edge-sensitive modes.
    #[must_use]
    pub const fn is_edge(self) -> bool {
        matches!(self, Self::Rising | Self::Falling | Self::Change)
    }

    /// `true` for level-sensitive modes.
    #[must_use]
    pub const fn is_level(self) -> bool {
        !self.is_edge()
    }

    /// Whether a pin moving from `from` to `to` fires this trigger.
    ///
    /// Level modes fire when the new level matches, whether or not the
    /// level actually changed.
    #[must_use]
    pub fn fires_on(self, from: PinState, to: PinState) -> bool {
        match self {
            Self::Rising => from == PinState::Low && to == PinState::High,
            Self::Falling => from == PinState::High && to == PinState::Low,
            Self::Change => from != to,
            Self::Low => to == PinState::Low,
            Self::High => to == PinState::High,
        }
    }

    /// Whether a pin resting at `level` keeps this trigger asserted.
    #[must_use]
    pub fn holds_at(self, level: PinState) -> bool {
        match self {
            Self::Low => level == PinState::Low,
            Self::High => level == PinState::High,
            Self::Rising | Self::Falling | Self::Change => false,
        }
    }

    /// Short name used in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Change => "change",
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_rejects_out_of_range_index() {
        assert!(InterruptLine::new(31).is_some());
        assert!(InterruptLine::new(32).is_none());
    }

    #[test]
    fn test_line_mask_is_single_bit() {
        let line = InterruptLine::new(5).unwrap();
        assert_eq!(line.mask(), 0b10_0000);
    }

    #[test]
    fn test_edge_triggers() {
        use PinState::{High, Low};
        assert!(TriggerMode::Rising.fires_on(Low, High));
        assert!(!TriggerMode::Rising.fires_on(High, Low));
        assert!(TriggerMode::Falling.fires_on(High, Low));
        assert!(TriggerMode::Change.fires_on(High, Low));
        assert!(TriggerMode::Change.fires_on(Low, High));
        assert!(!TriggerMode::Change.fires_on(High, High));
    }

    #[test]
    fn test_level_triggers_fire_without_transition() {
        use PinState::{High, Low};
        assert!(TriggerMode::Low.fires_on(Low, Low));
        assert!(TriggerMode::High.fires_on(Low, High));
        assert!(TriggerMode::Low.holds_at(Low));
        assert!(!TriggerMode::Change.holds_at(Low));
    }
}
