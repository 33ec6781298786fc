//! Runtime configuration for the sleep controller.

use platform::SleepMode;

/// What to do when asked to sleep forever with nothing registered that
/// could wake the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnwakeablePolicy {
    /// Log a warning and sleep anyway. Only an external reset recovers the
    /// device.
    #[default]
    Permit,
    /// Refuse with [`Error::NoWakeupSourceConfigured`](crate::Error) and
    /// leave the hardware untouched.
    Reject,
}

/// Sleep controller configuration.
///
/// ```
/// use lowpower::{ControllerConfig, UnwakeablePolicy};
/// use platform::SleepMode;
///
/// let config = ControllerConfig::new()
///     .with_unwakeable(UnwakeablePolicy::Reject)
///     .with_default_mode(SleepMode::DeepSleep);
/// assert_eq!(config.default_mode, SleepMode::DeepSleep);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Policy for unwakeable sleep requests.
    pub unwakeable: UnwakeablePolicy,
    /// Mode used by [`SleepController::sleep`](crate::SleepController::sleep).
    pub default_mode: SleepMode,
}

impl ControllerConfig {
    /// Defaults: permit unwakeable sleep, [`SleepMode::Sleep`].
    pub const fn new() -> Self {
        Self {
            unwakeable: UnwakeablePolicy::Permit,
            default_mode: SleepMode::Sleep,
        }
    }

    /// Set the unwakeable-sleep policy.
    #[must_use]
    pub const fn with_unwakeable(mut self, policy: UnwakeablePolicy) -> Self {
        self.unwakeable = policy;
        self
    }

    /// Set the mode used by `sleep`.
    #[must_use]
    pub const fn with_default_mode(mut self, mode: SleepMode) -> Self {
        self.default_mode = mode;
        self
    }
}
