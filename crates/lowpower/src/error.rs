//! Error taxonomy for the sleep controller.

use platform::{InterruptLine, PinId};

/// Errors returned by [`SleepController`](crate::SleepController).
///
/// Every variant except [`Error::Hardware`] leaves the controller exactly as
/// it was before the call. A hardware fault raised while sleeping still
/// returns the controller to [`PowerState::Awake`](platform::PowerState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
pub enum Error<E> {
    /// The pin cannot generate an external interrupt.
    #[error("pin {0} is not interrupt-capable")]
    InvalidPin(PinId),

    /// Detach was requested for a pin with no registered source.
    #[error("no wakeup source registered on pin {0}")]
    NotRegistered(PinId),

    /// The pin's interrupt line is already owned by another pin.
    #[error("pin {pin} shares {line} with registered pin {holder}")]
    LineInUse {
        /// Pin the caller tried to register.
        pin: PinId,
        /// Line both pins resolve to.
        line: InterruptLine,
        /// Pin currently registered on that line.
        holder: PinId,
    },

    /// Sleep forever was requested with no registered source, and the
    /// controller is configured to refuse it.
    #[error("sleep requested with no wakeup source and no timeout")]
    NoWakeupSourceConfigured,

    /// The wakeup hardware reported a fault.
    #[error("wakeup hardware fault")]
    Hardware(E),
}

impl<E> Error<E> {
    /// `true` for errors that leave the controller state untouched.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Hardware(_))
    }

    /// Short, allocation-free description used in log output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPin(_) => "invalid pin",
            Self::NotRegistered(_) => "not registered",
            Self::LineInUse { .. } => "line in use",
            Self::NoWakeupSourceConfigured => "no wakeup source configured",
            Self::Hardware(_) => "hardware fault",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E> = core::result::Result<T, Error<E>>;
