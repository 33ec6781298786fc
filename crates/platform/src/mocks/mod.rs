//! Mock implementations for testing
//!
//! [`MockWakeupHardware`] simulates an external interrupt controller, a
//! one-shot wake timer and the core's wait-for-interrupt instruction, so the
//! sleep controller can be exercised on the host.
//!
//! Time only advances while the simulated core is halted. Each call to
//! [`WakeupHardware::wait_for_interrupt`] consumes queued [`Stimulus`]
//! entries until some enabled line or the timer has latched a flag.

#![cfg(any(test, feature = "std"))]

use embassy_time::Duration;

use crate::config::{LINE_COUNT, MOCK_DEFAULT_LINES, MOCK_PIN_COUNT, MOCK_STIMULUS_DEPTH};
use crate::gpio::{InterruptLine, PinId, PinState, TriggerMode};
use crate::power::{PendingWakeups, SleepMode, WakeupHardware};

/// Something that happens to the simulated board while the core is halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stimulus {
    /// Drive a pin to a level.
    Level(PinId, PinState),
    /// Let virtual time pass.
    Advance(Duration),
    /// Latch flags directly, as if several lines fired in the same cycle.
    Pending(PendingWakeups),
}

/// Errors reported by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// The core halted with nothing left that could wake it.
    Stalled,
    /// A fault injected with [`MockWakeupHardware::fail_next_wait`].
    Injected,
    /// The stimulus queue is full.
    QueueFull,
    /// Pin outside the simulated range.
    NoSuchPin(PinId),
}

#[derive(Debug, Clone, Copy)]
struct LineConfig {
    pin: PinId,
    trigger: TriggerMode,
}

/// Host-side stand-in for a chip's wakeup logic.
pub struct MockWakeupHardware {
    line_map: [Option<InterruptLine>; MOCK_PIN_COUNT],
    levels: [PinState; MOCK_PIN_COUNT],
    lines: [Option<LineConfig>; LINE_COUNT],
    latched: PendingWakeups,
    stimuli: heapless::Deque<Stimulus, MOCK_STIMULUS_DEPTH>,
    now_ticks: u64,
    deadline_ticks: Option<u64>,
    mode: Option<SleepMode>,
    last_mode: Option<SleepMode>,
    enter_count: usize,
    exit_count: usize,
    wait_count: usize,
    fail_next_wait: bool,
    fail_next_enable: bool,
    /// Successful `disable_wakeup` calls left before one fails.
    fail_disable_after: Option<usize>,
    fail_next_arm: bool,
}

impl MockWakeupHardware {
    /// Create a mock where pins `0..16` sit on lines `0..16` and every
    /// other pin has no interrupt capability.
    pub fn new() -> Self {
        let mut line_map = [None; MOCK_PIN_COUNT];
        for (pin, slot) in (0..MOCK_DEFAULT_LINES).zip(line_map.iter_mut()) {
            *slot = InterruptLine::new(pin);
        }
        Self::with_map(line_map)
    }

    /// Create a mock with an explicit pin-to-line table. Pins not listed
    /// have no interrupt capability; entries beyond the simulated pin range
    /// are ignored.
    pub fn with_line_map(map: &[(u8, u8)]) -> Self {
        let mut line_map = [None; MOCK_PIN_COUNT];
        for &(pin, line) in map {
            if let Some(slot) = line_map.get_mut(usize::from(pin)) {
                *slot = InterruptLine::new(line);
            }
        }
        Self::with_map(line_map)
    }

    fn with_map(line_map: [Option<InterruptLine>; MOCK_PIN_COUNT]) -> Self {
        Self {
            line_map,
            levels: [PinState::Low; MOCK_PIN_COUNT],
            lines: [None; LINE_COUNT],
            latched: PendingWakeups::NONE,
            stimuli: heapless::Deque::new(),
            now_ticks: 0,
            deadline_ticks: None,
            mode: None,
            last_mode: None,
            enter_count: 0,
            exit_count: 0,
            wait_count: 0,
            fail_next_wait: false,
            fail_next_enable: false,
            fail_disable_after: None,
            fail_next_arm: false,
        }
    }

    /// Queue a stimulus for the next halt.
    pub fn push(&mut self, stimulus: Stimulus) -> Result<(), MockError> {
        self.stimuli
            .push_back(stimulus)
            .map_err(|_| MockError::QueueFull)
    }

    /// Queue a pin level change.
    pub fn drive(&mut self, pin: u8, level: PinState) -> Result<(), MockError> {
        self.push(Stimulus::Level(PinId::new(pin), level))
    }

    /// Queue an edge of the given polarity: the pin is first forced to the
    /// opposite level without firing, then driven to `to`.
    pub fn pulse(&mut self, pin: u8, to: PinState) -> Result<(), MockError> {
        let from = match to {
            PinState::High => PinState::Low,
            PinState::Low => PinState::High,
        };
        self.set_level(PinId::new(pin), from)?;
        self.drive(pin, to)
    }

    /// Queue several lines firing in the same cycle.
    pub fn fire_lines(&mut self, lines: &[u8]) -> Result<(), MockError> {
        let mask = lines
            .iter()
            .filter_map(|&l| InterruptLine::new(l))
            .fold(0u32, |acc, l| acc | l.mask());
        self.push(Stimulus::Pending(PendingWakeups {
            lines: mask,
            timer: false,
        }))
    }

    /// Set a pin level immediately, without evaluating triggers.
    pub fn set_level(&mut self, pin: PinId, level: PinState) -> Result<(), MockError> {
        let slot = self
            .levels
            .get_mut(usize::from(pin.number()))
            .ok_or(MockError::NoSuchPin(pin))?;
        *slot = level;
        Ok(())
    }

    /// Current simulated level of `pin`.
    pub fn level(&self, pin: PinId) -> Option<PinState> {
        self.levels.get(usize::from(pin.number())).copied()
    }

    /// Make the next `wait_for_interrupt` fail with [`MockError::Injected`].
    pub fn fail_next_wait(&mut self) {
        self.fail_next_wait = true;
    }

    /// Make the next `enable_wakeup` fail with [`MockError::Injected`]
    /// without touching the line.
    pub fn fail_next_enable(&mut self) {
        self.fail_next_enable = true;
    }

    /// Make the next `disable_wakeup` fail with [`MockError::Injected`],
    /// leaving the line enabled.
    pub fn fail_next_disable(&mut self) {
        self.fail_disable_after(0);
    }

    /// Let `skip` `disable_wakeup` calls succeed, then fail the next one
    /// with [`MockError::Injected`].
    pub fn fail_disable_after(&mut self, skip: usize) {
        self.fail_disable_after = Some(skip);
    }

    /// Make the next `arm_timer` fail with [`MockError::Injected`].
    pub fn fail_next_arm(&mut self) {
        self.fail_next_arm = true;
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        Duration::from_ticks(self.now_ticks)
    }

    /// Whether the wake timer is armed.
    pub fn timer_armed(&self) -> bool {
        self.deadline_ticks.is_some()
    }

    /// Trigger configured on `line`, if enabled.
    pub fn line_trigger(&self, line: InterruptLine) -> Option<TriggerMode> {
        self.line_config(line).map(|c| c.trigger)
    }

    /// Pin routed to `line`, if enabled.
    pub fn line_pin(&self, line: InterruptLine) -> Option<PinId> {
        self.line_config(line).map(|c| c.pin)
    }

    /// Number of enabled lines.
    pub fn enabled_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.is_some()).count()
    }

    /// Low-power mode currently entered, if any.
    pub fn current_mode(&self) -> Option<SleepMode> {
        self.mode
    }

    /// Most recent mode passed to `enter_low_power`.
    pub fn last_mode(&self) -> Option<SleepMode> {
        self.last_mode
    }

    /// Number of `enter_low_power` calls.
    pub fn enter_count(&self) -> usize {
        self.enter_count
    }

    /// Number of `exit_low_power` calls.
    pub fn exit_count(&self) -> usize {
        self.exit_count
    }

    /// Number of `wait_for_interrupt` calls.
    pub fn wait_count(&self) -> usize {
        self.wait_count
    }

    /// Stimuli not consumed yet.
    pub fn queued(&self) -> usize {
        self.stimuli.len()
    }

    fn line_config(&self, line: InterruptLine) -> Option<LineConfig> {
        self.lines.get(usize::from(line.index())).copied().flatten()
    }

    fn enabled_mask(&self) -> u32 {
        self.lines
            .iter()
            .zip(0u8..)
            .filter(|(cfg, _)| cfg.is_some())
            .filter_map(|(_, idx)| InterruptLine::new(idx))
            .fold(0, |acc, line| acc | line.mask())
    }

    fn apply(&mut self, stimulus: Stimulus) -> Result<(), MockError> {
        match stimulus {
            Stimulus::Level(pin, to) => {
                let from = self.level(pin).ok_or(MockError::NoSuchPin(pin))?;
                self.set_level(pin, to)?;
                for (cfg, idx) in self.lines.iter().zip(0u8..) {
                    let Some(cfg) = cfg else { continue };
                    if cfg.pin == pin && cfg.trigger.fires_on(from, to) {
                        if let Some(line) = InterruptLine::new(idx) {
                            self.latched.lines |= line.mask();
                        }
                    }
                }
            }
            Stimulus::Advance(by) => {
                self.now_ticks = self.now_ticks.saturating_add(by.as_ticks());
                self.check_timer();
            }
            Stimulus::Pending(flags) => {
                // Masked lines cannot latch.
                self.latched.merge(flags.masked(self.enabled_mask()));
            }
        }
        Ok(())
    }

    fn check_timer(&mut self) {
        if let Some(deadline) = self.deadline_ticks {
            if self.now_ticks >= deadline {
                self.latched.timer = true;
                self.deadline_ticks = None;
            }
        }
    }

    fn latch_held_levels(&mut self) {
        let mut mask = 0;
        for (cfg, idx) in self.lines.iter().zip(0u8..) {
            let Some(cfg) = cfg else { continue };
            let held = self
                .levels
                .get(usize::from(cfg.pin.number()))
                .is_some_and(|&lvl| cfg.trigger.holds_at(lvl));
            if held {
                if let Some(line) = InterruptLine::new(idx) {
                    mask |= line.mask();
                }
            }
        }
        self.latched.lines |= mask;
    }
}

impl Default for MockWakeupHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeupHardware for MockWakeupHardware {
    type Error = MockError;

    fn interrupt_line(&self, pin: PinId) -> Option<InterruptLine> {
        self.line_map.get(usize::from(pin.number())).copied().flatten()
    }

    fn enable_wakeup(
        &mut self,
        pin: PinId,
        line: InterruptLine,
        trigger: TriggerMode,
    ) -> Result<(), Self::Error> {
        if core::mem::take(&mut self.fail_next_enable) {
            return Err(MockError::Injected);
        }
        if self.interrupt_line(pin) != Some(line) {
            return Err(MockError::NoSuchPin(pin));
        }
        if let Some(slot) = self.lines.get_mut(usize::from(line.index())) {
            *slot = Some(LineConfig { pin, trigger });
        }
        Ok(())
    }

    fn disable_wakeup(&mut self, line: InterruptLine) -> Result<(), Self::Error> {
        match self.fail_disable_after {
            Some(0) => {
                self.fail_disable_after = None;
                return Err(MockError::Injected);
            }
            Some(skip) => self.fail_disable_after = Some(skip.saturating_sub(1)),
            None => {}
        }
        if let Some(slot) = self.lines.get_mut(usize::from(line.index())) {
            *slot = None;
        }
        self.latched.lines &= !line.mask();
        Ok(())
    }

    fn arm_timer(&mut self, after: Duration) -> Result<(), Self::Error> {
        if core::mem::take(&mut self.fail_next_arm) {
            return Err(MockError::Injected);
        }
        self.deadline_ticks = Some(self.now_ticks.saturating_add(after.as_ticks()));
        self.check_timer();
        Ok(())
    }

    fn disarm_timer(&mut self) {
        self.deadline_ticks = None;
    }

    fn enter_low_power(&mut self, mode: SleepMode) {
        self.mode = Some(mode);
        self.last_mode = Some(mode);
        self.enter_count = self.enter_count.saturating_add(1);
    }

    fn exit_low_power(&mut self, _mode: SleepMode) {
        self.mode = None;
        self.exit_count = self.exit_count.saturating_add(1);
    }

    fn wait_for_interrupt(&mut self) -> Result<(), Self::Error> {
        self.wait_count = self.wait_count.saturating_add(1);
        if self.fail_next_wait {
            self.fail_next_wait = false;
            return Err(MockError::Injected);
        }
        loop {
            self.latch_held_levels();
            if !self.latched.is_empty() {
                return Ok(());
            }
            if let Some(stimulus) = self.stimuli.pop_front() {
                self.apply(stimulus)?;
                continue;
            }
            // Nothing queued: only the timer can still fire.
            match self.deadline_ticks {
                Some(deadline) => {
                    self.now_ticks = deadline;
                    self.check_timer();
                }
                None => return Err(MockError::Stalled),
            }
        }
    }

    fn take_pending(&mut self) -> PendingWakeups {
        core::mem::take(&mut self.latched)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(n: u8) -> InterruptLine {
        InterruptLine::new(n).unwrap()
    }

    #[test]
    fn test_default_map_covers_first_sixteen_pins() {
        let hw = MockWakeupHardware::new();
        assert_eq!(hw.interrupt_line(PinId::new(2)), Some(line(2)));
        assert_eq!(hw.interrupt_line(PinId::new(15)), Some(line(15)));
        assert_eq!(hw.interrupt_line(PinId::new(16)), None);
    }

    #[test]
    fn test_change_edge_latches_line() {
        let mut hw = MockWakeupHardware::new();
        hw.enable_wakeup(PinId::new(2), line(2), TriggerMode::Change)
            .unwrap();
        hw.drive(2, PinState::High).unwrap();

        hw.wait_for_interrupt().unwrap();
        let pending = hw.take_pending();
        assert!(pending.contains(line(2)));
        assert!(hw.take_pending().is_empty());
    }

    #[test]
    fn test_rising_ignores_falling_edge() {
        let mut hw = MockWakeupHardware::new();
        hw.enable_wakeup(PinId::new(3), line(3), TriggerMode::Rising)
            .unwrap();
        hw.set_level(PinId::new(3), PinState::High).unwrap();
        hw.drive(3, PinState::Low).unwrap();

        assert_eq!(hw.wait_for_interrupt(), Err(MockError::Stalled));
    }

    #[test]
    fn test_held_level_latches_immediately() {
        let mut hw = MockWakeupHardware::new();
        hw.enable_wakeup(PinId::new(4), line(4), TriggerMode::Low)
            .unwrap();

        hw.wait_for_interrupt().unwrap();
        assert!(hw.take_pending().contains(line(4)));
    }

    #[test]
    fn test_timer_fires_when_queue_drains() {
        let mut hw = MockWakeupHardware::new();
        hw.arm_timer(Duration::from_millis(500)).unwrap();

        hw.wait_for_interrupt().unwrap();
        let pending = hw.take_pending();
        assert!(pending.timer);
        assert_eq!(hw.now(), Duration::from_millis(500));
        assert!(!hw.timer_armed());
    }

    #[test]
    fn test_masked_lines_do_not_latch() {
        let mut hw = MockWakeupHardware::new();
        hw.enable_wakeup(PinId::new(1), line(1), TriggerMode::Change)
            .unwrap();
        hw.fire_lines(&[1, 7]).unwrap();

        hw.wait_for_interrupt().unwrap();
        assert_eq!(hw.take_pending().lines, line(1).mask());
    }

    #[test]
    fn test_injected_faults_fire_once() {
        let mut hw = MockWakeupHardware::new();
        hw.fail_next_enable();
        hw.fail_next_arm();

        assert_eq!(
            hw.enable_wakeup(PinId::new(1), line(1), TriggerMode::Rising),
            Err(MockError::Injected)
        );
        assert_eq!(hw.line_trigger(line(1)), None);
        assert_eq!(
            hw.arm_timer(Duration::from_millis(1)),
            Err(MockError::Injected)
        );
        assert!(!hw.timer_armed());

        hw.enable_wakeup(PinId::new(1), line(1), TriggerMode::Rising)
            .unwrap();
        hw.fail_next_disable();
        assert_eq!(hw.disable_wakeup(line(1)), Err(MockError::Injected));
        assert_eq!(hw.line_trigger(line(1)), Some(TriggerMode::Rising));
        hw.disable_wakeup(line(1)).unwrap();
        assert_eq!(hw.enabled_lines(), 0);
    }

    #[test]
    fn test_enable_rejects_wrong_line() {
        let mut hw = MockWakeupHardware::new();
        let result = hw.enable_wakeup(PinId::new(2), line(9), TriggerMode::Rising);
        assert_eq!(result, Err(MockError::NoSuchPin(PinId::new(2))));
    }
}
