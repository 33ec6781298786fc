//! The sleep controller: power state, wakeup-source registration, and the
//! enter/wait/dispatch/exit sequence.
//!
//! # State machine
//!
//! ```text
//!            sleep()                    source fires
//!  ┌───────┐ ───────► ┌──────────┐ ─── or timer ───► dispatch ──┐
//!  │ Awake │          │ Sleeping │                   callback   │
//!  └───────┘ ◄─────────────────────────────────────────────────┘
//! ```
//!
//! One `sleep` call services exactly one wake event. When several lines are
//! pending at the same time, the lowest line index wins; the others are
//! cleared and reported in [`WakeReport::serviced`], never dispatched.

use embassy_time::Duration;
use platform::{
    InterruptLine, PendingWakeups, PinId, PowerState, SleepMode, TriggerMode, WakeSource,
    WakeupHardware,
};

use crate::config::{ControllerConfig, UnwakeablePolicy};
use crate::error::{Error, Result};
use crate::source::{SourceTable, WakeupHandler, WakeupSource};

/// Why a `sleep` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCause {
    /// A registered pin source fired and its callback ran.
    Pin {
        /// Pin of the winning source.
        pin: PinId,
        /// Line it fired on.
        line: InterruptLine,
    },
    /// The timeout elapsed with no pin source pending.
    Timer,
}

impl WakeCause {
    /// Collapse into the platform's reporting enum.
    pub fn source(self) -> WakeSource {
        match self {
            Self::Pin { pin, .. } => WakeSource::Gpio(pin),
            Self::Timer => WakeSource::Timer,
        }
    }
}

/// Outcome of one `sleep` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeReport {
    /// What woke the core.
    pub cause: WakeCause,
    /// Mode the core slept in.
    pub mode: SleepMode,
    /// Other registered lines that were pending at the same time. Cleared
    /// without running their callbacks.
    pub serviced: u32,
}

/// Counters kept across sleep calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepStats {
    /// Sleep calls that returned a [`WakeReport`].
    pub sleeps: u32,
    /// Wakes caused by a pin source.
    pub pin_wakes: u32,
    /// Wakes caused by the timeout.
    pub timer_wakes: u32,
    /// Halts that ended with nothing registered pending.
    pub spurious: u32,
    /// Callbacks that reported a [`HandlerFault`](crate::HandlerFault).
    pub handler_faults: u32,
}

/// Owns the power state and the wakeup sources of a single core.
///
/// `'a` is the lifetime of the registered callbacks: anything a callback
/// borrows (counters, flags) must outlive the controller.
///
/// ```
/// use embassy_time::Duration;
/// use lowpower::{SleepController, WakeCause, WakeCounter};
/// use platform::mocks::MockWakeupHardware;
/// use platform::{PinId, PinState, PowerState, TriggerMode};
///
/// let wakes = WakeCounter::new();
/// let bump = || wakes.increment();
///
/// let mut ctrl = SleepController::new(MockWakeupHardware::new());
/// ctrl.attach_interrupt_wakeup(PinId::new(2), &bump, TriggerMode::Change).unwrap();
///
/// ctrl.hardware_mut().drive(2, PinState::High).unwrap();
/// let report = ctrl.sleep(None).unwrap();
///
/// assert!(matches!(report.cause, WakeCause::Pin { .. }));
/// assert_eq!(wakes.get(), 1);
/// assert_eq!(ctrl.power_state(), PowerState::Awake);
/// ```
pub struct SleepController<'a, H: WakeupHardware> {
    hw: H,
    sources: SourceTable<'a>,
    state: PowerState,
    config: ControllerConfig,
    last_wake: Option<WakeReport>,
    stats: SleepStats,
}

impl<'a, H: WakeupHardware> SleepController<'a, H> {
    /// Controller with the default configuration.
    pub fn new(hw: H) -> Self {
        Self::with_config(hw, ControllerConfig::new())
    }

    /// Controller with an explicit configuration.
    pub fn with_config(hw: H, config: ControllerConfig) -> Self {
        Self {
            hw,
            sources: SourceTable::new(),
            state: PowerState::Awake,
            config,
            last_wake: None,
            stats: SleepStats::default(),
        }
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Register `handler` to run when `pin` wakes the core with `trigger`.
    ///
    /// Registering a pin that already has a source replaces it and returns
    /// the previous trigger.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPin`] if the pin has no interrupt line.
    /// - [`Error::LineInUse`] if another pin holds the same line.
    /// - [`Error::Hardware`] if the line could not be configured.
    ///
    /// The source table is untouched on every error.
    pub fn attach_interrupt_wakeup(
        &mut self,
        pin: PinId,
        handler: &'a dyn WakeupHandler,
        trigger: TriggerMode,
    ) -> Result<Option<TriggerMode>, H::Error> {
        let line = self.hw.interrupt_line(pin).ok_or(Error::InvalidPin(pin))?;

        if let Some(holder) = self.sources.by_line(line) {
            if holder.pin() != pin {
                return Err(Error::LineInUse {
                    pin,
                    line,
                    holder: holder.pin(),
                });
            }
        }

        self.hw
            .enable_wakeup(pin, line, trigger)
            .map_err(Error::Hardware)?;

        let previous = self
            .sources
            .insert(WakeupSource::new(pin, line, trigger, handler));
        match previous {
            Some(_) => warn!("pin {}: wakeup source replaced ({})", pin, trigger.as_str()),
            None => debug!("pin {}: wakeup on {} ({})", pin, line, trigger.as_str()),
        }
        Ok(previous.map(|p| p.trigger()))
    }

    /// Remove the source registered on `pin` and mask its line.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRegistered`] if `pin` has no source.
    /// - [`Error::Hardware`] if the line could not be masked; the source
    ///   stays registered.
    pub fn detach_interrupt_wakeup(&mut self, pin: PinId) -> Result<(), H::Error> {
        let line = self
            .sources
            .by_pin(pin)
            .map(WakeupSource::line)
            .ok_or(Error::NotRegistered(pin))?;

        self.hw.disable_wakeup(line).map_err(Error::Hardware)?;
        self.sources.remove(line);
        debug!("pin {}: wakeup detached", pin);
        Ok(())
    }

    /// Detach every source, as a hardware reset would.
    ///
    /// # Errors
    ///
    /// Stops at the first line that cannot be masked; sources detached
    /// before it stay detached.
    pub fn detach_all(&mut self) -> Result<(), H::Error> {
        loop {
            let Some(line) = self.sources.iter().next().map(WakeupSource::line) else {
                return Ok(());
            };
            self.hw.disable_wakeup(line).map_err(Error::Hardware)?;
            self.sources.remove(line);
        }
    }

    // ── Sleep ───────────────────────────────────────────────────────────────

    /// Sleep in the configured default mode until a registered source fires
    /// or `timeout` elapses. `None` sleeps until a source fires.
    ///
    /// Sleeping forever with nothing registered can only be ended by an
    /// external reset; see [`UnwakeablePolicy`].
    ///
    /// # Errors
    ///
    /// - [`Error::NoWakeupSourceConfigured`] under [`UnwakeablePolicy::Reject`].
    /// - [`Error::Hardware`] if the hardware faults; the controller is back
    ///   in [`PowerState::Awake`] when this returns.
    pub fn sleep(&mut self, timeout: Option<Duration>) -> Result<WakeReport, H::Error> {
        self.sleep_with(self.config.default_mode, timeout)
    }

    /// Sleep for at most `duration`.
    ///
    /// # Errors
    ///
    /// [`Error::Hardware`] as for [`sleep`](Self::sleep). The timeout makes
    /// the call wakeable, so the unwakeable policy never applies.
    pub fn sleep_for(&mut self, duration: Duration) -> Result<WakeReport, H::Error> {
        self.sleep(Some(duration))
    }

    /// Like [`sleep`](Self::sleep) in [`SleepMode::Idle`].
    ///
    /// # Errors
    ///
    /// Same as [`sleep`](Self::sleep).
    pub fn idle(&mut self, timeout: Option<Duration>) -> Result<WakeReport, H::Error> {
        self.sleep_with(SleepMode::Idle, timeout)
    }

    /// Like [`sleep`](Self::sleep) in [`SleepMode::DeepSleep`].
    ///
    /// # Errors
    ///
    /// Same as [`sleep`](Self::sleep).
    pub fn deep_sleep(&mut self, timeout: Option<Duration>) -> Result<WakeReport, H::Error> {
        self.sleep_with(SleepMode::DeepSleep, timeout)
    }

    /// Sleep in `mode` until a registered source fires or `timeout`
    /// elapses.
    ///
    /// # Errors
    ///
    /// - [`Error::NoWakeupSourceConfigured`] under [`UnwakeablePolicy::Reject`]
    ///   with no source and no timeout.
    /// - [`Error::Hardware`] if the timer cannot be armed (the core never
    ///   leaves [`PowerState::Awake`]) or the hardware faults while halted
    ///   (the core is back in [`PowerState::Awake`] on return).
    pub fn sleep_with(
        &mut self,
        mode: SleepMode,
        timeout: Option<Duration>,
    ) -> Result<WakeReport, H::Error> {
        if timeout.is_none() && self.sources.is_empty() {
            match self.config.unwakeable {
                UnwakeablePolicy::Reject => return Err(Error::NoWakeupSourceConfigured),
                UnwakeablePolicy::Permit => {
                    warn!("sleeping with no wakeup source and no timeout, only a reset can wake the core");
                }
            }
        }

        if let Some(after) = timeout {
            self.hw.arm_timer(after).map_err(Error::Hardware)?;
        }

        self.state = PowerState::Sleeping;
        debug!("entering {}", mode.as_str());
        self.hw.enter_low_power(mode);

        let woke = self
            .wait_for_wake(timeout.is_some())
            .map(|pending| self.dispatch(mode, pending));

        self.hw.exit_low_power(mode);
        self.hw.disarm_timer();
        self.state = PowerState::Awake;

        let report = woke.map_err(|e| {
            error!("sleep aborted by hardware fault");
            Error::Hardware(e)
        })?;
        self.stats.sleeps = self.stats.sleeps.wrapping_add(1);
        self.last_wake = Some(report);
        Ok(report)
    }

    /// Halt until a registered line (or the timer, if `timed`) is pending.
    fn wait_for_wake(&mut self, timed: bool) -> core::result::Result<PendingWakeups, H::Error> {
        loop {
            self.hw.wait_for_interrupt()?;
            let raw = self.hw.take_pending();
            let mut pending = raw.masked(self.sources.mask());
            pending.timer &= timed;
            if !pending.is_empty() {
                return Ok(pending);
            }
            self.stats.spurious = self.stats.spurious.wrapping_add(1);
            trace!("spurious wake, lines {}", raw.lines);
        }
    }

    /// Interrupt trampoline: pick the winning source, run its callback and
    /// build the report. Runs while still [`PowerState::Sleeping`].
    fn dispatch(&mut self, mode: SleepMode, pending: PendingWakeups) -> WakeReport {
        let winner = pending
            .lowest_line()
            .and_then(|line| self.sources.by_line(line).copied());

        let Some(source) = winner else {
            self.stats.timer_wakes = self.stats.timer_wakes.wrapping_add(1);
            info!("woke from {} on timeout", mode.as_str());
            return WakeReport {
                cause: WakeCause::Timer,
                mode,
                serviced: 0,
            };
        };

        if let Err(fault) = source.handler().on_wakeup() {
            self.stats.handler_faults = self.stats.handler_faults.wrapping_add(1);
            warn!("pin {}: wakeup callback failed: {}", source.pin(), fault.reason);
        }
        self.stats.pin_wakes = self.stats.pin_wakes.wrapping_add(1);

        let serviced = pending.lines & !source.line().mask();
        if serviced != 0 {
            debug!("lines {} pending alongside {}, not dispatched", serviced, source.line());
        }
        info!("woke from {} on pin {}", mode.as_str(), source.pin());

        WakeReport {
            cause: WakeCause::Pin {
                pin: source.pin(),
                line: source.line(),
            },
            mode,
            serviced,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Current power state. Always [`PowerState::Awake`] from the caller's
    /// point of view, since `sleep` holds `&mut self` while sleeping.
    pub fn power_state(&self) -> PowerState {
        self.state
    }

    /// Whether `pin` has a registered source.
    pub fn is_registered(&self, pin: PinId) -> bool {
        self.sources.by_pin(pin).is_some()
    }

    /// Source registered on `pin`, if any.
    pub fn source(&self, pin: PinId) -> Option<&WakeupSource<'a>> {
        self.sources.by_pin(pin)
    }

    /// Registered sources in line (priority) order.
    pub fn sources(&self) -> impl Iterator<Item = &WakeupSource<'a>> {
        self.sources.iter()
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Report of the most recent successful sleep.
    pub fn last_wake(&self) -> Option<WakeReport> {
        self.last_wake
    }

    /// Counters kept across sleep calls.
    pub fn stats(&self) -> SleepStats {
        self.stats
    }

    /// Active configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Shared access to the hardware.
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Exclusive access to the hardware, for board glue that must touch it
    /// between sleeps.
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Tear down the controller and hand the hardware back. Lines stay
    /// configured as they were.
    pub fn release(self) -> H {
        self.hw
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shared::WakeCounter;
    use crate::source::HandlerFault;
    use platform::mocks::{MockError, MockWakeupHardware};
    use platform::PinState;

    struct Faulty<'c>(&'c WakeCounter);

    impl WakeupHandler for Faulty<'_> {
        fn on_wakeup(&self) -> core::result::Result<(), HandlerFault> {
            self.0.increment();
            Err(HandlerFault::new("sensor not ready"))
        }
    }

    #[test]
    fn test_starts_awake_and_empty() {
        let ctrl = SleepController::new(MockWakeupHardware::new());
        assert_eq!(ctrl.power_state(), PowerState::Awake);
        assert_eq!(ctrl.source_count(), 0);
        assert!(ctrl.last_wake().is_none());
    }

    #[test]
    fn test_line_in_use_leaves_table_unchanged() {
        let noop = || {};
        // Pins 2 and 18 share line 2, as on parts with a shared EIC.
        let hw = MockWakeupHardware::with_line_map(&[(2, 2), (18, 2)]);
        let mut ctrl = SleepController::new(hw);
        ctrl.attach_interrupt_wakeup(PinId::new(2), &noop, TriggerMode::Falling)
            .unwrap();

        let err = ctrl
            .attach_interrupt_wakeup(PinId::new(18), &noop, TriggerMode::Rising)
            .unwrap_err();

        assert_eq!(
            err,
            Error::LineInUse {
                pin: PinId::new(18),
                line: InterruptLine::new(2).unwrap(),
                holder: PinId::new(2),
            }
        );
        assert!(err.is_recoverable());
        assert_eq!(ctrl.source_count(), 1);
        assert_eq!(
            ctrl.hardware().line_trigger(InterruptLine::new(2).unwrap()),
            Some(TriggerMode::Falling)
        );
    }

    #[test]
    fn test_replacement_returns_previous_trigger() {
        let noop = || {};
        let mut ctrl = SleepController::new(MockWakeupHardware::new());
        assert_eq!(
            ctrl.attach_interrupt_wakeup(PinId::new(5), &noop, TriggerMode::Rising)
                .unwrap(),
            None
        );
        assert_eq!(
            ctrl.attach_interrupt_wakeup(PinId::new(5), &noop, TriggerMode::Low)
                .unwrap(),
            Some(TriggerMode::Rising)
        );
        assert_eq!(ctrl.source(PinId::new(5)).unwrap().trigger(), TriggerMode::Low);
    }

    #[test]
    fn test_failing_callback_is_swallowed() {
        let calls = WakeCounter::new();
        let faulty = Faulty(&calls);
        let mut ctrl = SleepController::new(MockWakeupHardware::new());
        ctrl.attach_interrupt_wakeup(PinId::new(3), &faulty, TriggerMode::Change)
            .unwrap();
        ctrl.hardware_mut().drive(3, PinState::High).unwrap();

        let report = ctrl.sleep(None).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(ctrl.stats().handler_faults, 1);
        assert_eq!(
            report.cause,
            WakeCause::Pin {
                pin: PinId::new(3),
                line: InterruptLine::new(3).unwrap(),
            }
        );
    }

    #[test]
    fn test_hardware_fault_returns_awake() {
        let noop = || {};
        let mut ctrl = SleepController::new(MockWakeupHardware::new());
        ctrl.attach_interrupt_wakeup(PinId::new(1), &noop, TriggerMode::Change)
            .unwrap();
        ctrl.hardware_mut().fail_next_wait();

        let err = ctrl.sleep(None).unwrap_err();

        assert_eq!(err, Error::Hardware(MockError::Injected));
        assert!(!err.is_recoverable());
        assert_eq!(ctrl.power_state(), PowerState::Awake);
        assert_eq!(ctrl.hardware().current_mode(), None);
        assert_eq!(ctrl.hardware().exit_count(), 1);
        assert!(ctrl.last_wake().is_none());
        assert_eq!(ctrl.stats().sleeps, 0);
    }

    #[test]
    fn test_unregistered_line_does_not_end_sleep() {
        let wakes = WakeCounter::new();
        let bump = || wakes.increment();
        let mut ctrl = SleepController::new(MockWakeupHardware::new());
        ctrl.attach_interrupt_wakeup(PinId::new(6), &bump, TriggerMode::Rising)
            .unwrap();

        // Timer fires first but no timeout was requested: it is stale and
        // must not end the sleep.
        let hw = ctrl.hardware_mut();
        hw.push(platform::mocks::Stimulus::Pending(PendingWakeups {
            lines: 0,
            timer: true,
        }))
        .unwrap();
        hw.drive(6, PinState::High).unwrap();

        let report = ctrl.sleep(None).unwrap();

        assert_eq!(wakes.get(), 1);
        assert!(matches!(report.cause, WakeCause::Pin { .. }));
        assert_eq!(ctrl.stats().spurious, 1);
    }

    #[test]
    fn test_detach_all_masks_every_line() {
        let noop = || {};
        let mut ctrl = SleepController::new(MockWakeupHardware::new());
        for pin in [0u8, 4, 9] {
            ctrl.attach_interrupt_wakeup(PinId::new(pin), &noop, TriggerMode::Falling)
                .unwrap();
        }

        ctrl.detach_all().unwrap();

        assert_eq!(ctrl.source_count(), 0);
        assert_eq!(ctrl.hardware().enabled_lines(), 0);
    }

    #[test]
    fn test_mode_variants_reach_hardware() {
        let mut ctrl = SleepController::new(MockWakeupHardware::new());

        let report = ctrl.idle(Some(Duration::from_millis(1))).unwrap();
        assert_eq!(report.mode, SleepMode::Idle);
        assert_eq!(ctrl.hardware().last_mode(), Some(SleepMode::Idle));

        let report = ctrl.deep_sleep(Some(Duration::from_millis(1))).unwrap();
        assert_eq!(report.mode, SleepMode::DeepSleep);
        assert_eq!(ctrl.hardware().last_mode(), Some(SleepMode::DeepSleep));
    }
}
