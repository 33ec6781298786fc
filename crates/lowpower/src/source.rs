//! Wakeup sources and the line-indexed callback table.

use platform::config::LINE_COUNT;
use platform::{InterruptLine, PinId, TriggerMode};

/// Failure reported by a [`WakeupHandler`].
///
/// The controller logs it and counts it; it never reaches the code that
/// called `sleep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandlerFault {
    /// Static description for the log.
    pub reason: &'static str,
}

impl HandlerFault {
    /// Build a fault with a static reason.
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Zero-argument callback run when its source wakes the core.
///
/// Runs in the wake path before peripheral clocks are restored: it must not
/// block, wait, or sleep again. State shared with the main line has to be
/// interrupt-safe, which the `Sync` bound enforces (see [`crate::shared`]).
///
/// Plain closures and functions are handlers:
///
/// ```
/// use lowpower::{WakeCounter, WakeupHandler};
///
/// let wakes = WakeCounter::new();
/// let handler = || wakes.increment();
/// handler.on_wakeup().unwrap();
/// assert_eq!(wakes.get(), 1);
/// ```
pub trait WakeupHandler: Sync {
    /// Called once per wake caused by this handler's source.
    fn on_wakeup(&self) -> Result<(), HandlerFault>;
}

impl<F> WakeupHandler for F
where
    F: Fn() + Sync,
{
    fn on_wakeup(&self) -> Result<(), HandlerFault> {
        self();
        Ok(())
    }
}

/// A registered wakeup condition: pin, resolved line, trigger and callback.
#[derive(Clone, Copy)]
pub struct WakeupSource<'a> {
    pin: PinId,
    line: InterruptLine,
    trigger: TriggerMode,
    handler: &'a dyn WakeupHandler,
}

impl<'a> WakeupSource<'a> {
    pub(crate) fn new(
        pin: PinId,
        line: InterruptLine,
        trigger: TriggerMode,
        handler: &'a dyn WakeupHandler,
    ) -> Self {
        Self {
            pin,
            line,
            trigger,
            handler,
        }
    }

    /// Pin this source watches.
    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Interrupt line the pin resolved to.
    pub fn line(&self) -> InterruptLine {
        self.line
    }

    /// Trigger policy.
    pub fn trigger(&self) -> TriggerMode {
        self.trigger
    }

    pub(crate) fn handler(&self) -> &'a dyn WakeupHandler {
        self.handler
    }
}

impl core::fmt::Debug for WakeupSource<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WakeupSource")
            .field("pin", &self.pin)
            .field("line", &self.line)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

/// Fixed table of sources, one slot per interrupt line.
///
/// Keyed by line so the dispatch path is a single index; pin lookups scan
/// the (at most [`LINE_COUNT`]) occupied slots.
pub(crate) struct SourceTable<'a> {
    slots: [Option<WakeupSource<'a>>; LINE_COUNT],
    /// Bit `n` set when slot `n` is occupied.
    occupied: u32,
}

impl<'a> SourceTable<'a> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [None; LINE_COUNT],
            occupied: 0,
        }
    }

    pub(crate) fn by_line(&self, line: InterruptLine) -> Option<&WakeupSource<'a>> {
        self.slots.get(usize::from(line.index()))?.as_ref()
    }

    pub(crate) fn by_pin(&self, pin: PinId) -> Option<&WakeupSource<'a>> {
        self.iter().find(|s| s.pin == pin)
    }

    /// Store `source` in its line's slot, returning whatever was there.
    pub(crate) fn insert(&mut self, source: WakeupSource<'a>) -> Option<WakeupSource<'a>> {
        let line = source.line;
        let slot = self.slots.get_mut(usize::from(line.index()))?;
        self.occupied |= line.mask();
        slot.replace(source)
    }

    pub(crate) fn remove(&mut self, line: InterruptLine) -> Option<WakeupSource<'a>> {
        let taken = self.slots.get_mut(usize::from(line.index()))?.take();
        self.occupied &= !line.mask();
        taken
    }

    /// Mask of lines with a registered source.
    pub(crate) fn mask(&self) -> u32 {
        self.occupied
    }

    pub(crate) fn len(&self) -> usize {
        self.occupied.count_ones() as usize
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &WakeupSource<'a>> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn noop() {}

    fn source(pin: u8, line: u8) -> WakeupSource<'static> {
        WakeupSource::new(
            PinId::new(pin),
            InterruptLine::new(line).unwrap(),
            TriggerMode::Change,
            &noop,
        )
    }

    #[test]
    fn test_insert_tracks_mask() {
        let mut table = SourceTable::new();
        assert!(table.insert(source(2, 2)).is_none());
        assert!(table.insert(source(9, 5)).is_none());

        assert_eq!(table.mask(), 0b10_0100);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_insert_same_line_returns_previous() {
        let mut table = SourceTable::new();
        table.insert(source(2, 2));
        let previous = table.insert(source(2, 2)).unwrap();

        assert_eq!(previous.pin(), PinId::new(2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_clears_slot_and_mask() {
        let mut table = SourceTable::new();
        table.insert(source(4, 4));

        let removed = table.remove(InterruptLine::new(4).unwrap());
        assert!(removed.is_some());
        assert!(table.is_empty());
        assert!(table.by_pin(PinId::new(4)).is_none());
    }

    #[test]
    fn test_lookup_by_pin_and_line() {
        let mut table = SourceTable::new();
        table.insert(source(30, 3));

        let line = InterruptLine::new(3).unwrap();
        assert_eq!(table.by_pin(PinId::new(30)).unwrap().line(), line);
        assert_eq!(table.by_line(line).unwrap().pin(), PinId::new(30));
    }
}
