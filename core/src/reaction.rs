//! Reactions queued on a settlable value.

use std::fmt;

use deferral_types::Settlement;

use crate::resolution::{Candidate, propagate, resolve};
use crate::settlable::{Payload, RejectionReason, SettlableValue};

/// Continuation run when the owner fulfills.
pub type FulfilledHandler<T, E> = Box<dyn FnOnce(T) -> Result<Candidate<T, E>, E>>;

/// Continuation run when the owner rejects.
pub type RejectedHandler<T, E> = Box<dyn FnOnce(E) -> Result<Candidate<T, E>, E>>;

/// The pair of optional continuations passed to
/// [`SettlableValue::register_reaction`].
///
/// Returning `Err(reason)` from a handler rejects the derived value with
/// `reason`. Returning `Ok(candidate)` resolves the derived value with
/// `candidate`, which may itself be another settlable value or a thenable.
pub struct Handlers<T, E> {
    on_fulfilled: Option<FulfilledHandler<T, E>>,
    on_rejected: Option<RejectedHandler<T, E>>,
}

impl<T, E> Handlers<T, E> {
    /// No handlers: both branches pass the settlement through.
    #[must_use]
    pub fn new() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }

    pub fn on_fulfilled<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(T) -> Result<Candidate<T, E>, E> + 'static,
    {
        self.on_fulfilled = Some(Box::new(handler));
        self
    }

    pub fn on_rejected<R>(mut self, handler: R) -> Self
    where
        R: FnOnce(E) -> Result<Candidate<T, E>, E> + 'static,
    {
        self.on_rejected = Some(Box::new(handler));
        self
    }

    /// Run the branch matching `settlement`.
    ///
    /// A missing fulfillment handler returns the value unchanged; a missing
    /// rejection handler fails with the same reason.
    fn invoke(self, settlement: Settlement<T, E>) -> Result<Candidate<T, E>, E> {
        match settlement {
            Settlement::Fulfilled(value) => match self.on_fulfilled {
                Some(handler) => handler(value),
                None => Ok(Candidate::Plain(value)),
            },
            Settlement::Rejected(reason) => match self.on_rejected {
                Some(handler) => handler(reason),
                None => Err(reason),
            },
        }
    }
}

impl<T, E> Default for Handlers<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Handlers<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

pub(crate) enum Reaction<T, E> {
    /// Registered through `register_reaction`; settles `derived` with the handler outcome.
    Chained {
        handlers: Handlers<T, E>,
        derived: SettlableValue<T, E>,
    },
    /// Registered by the resolution procedure while `target` waits on a pending value.
    Adopt { target: SettlableValue<T, E> },
}

impl<T: Payload, E: RejectionReason> Reaction<T, E> {
    pub(crate) fn run(self, settlement: Settlement<T, E>) {
        match self {
            Self::Chained { handlers, derived } => match handlers.invoke(settlement) {
                Ok(candidate) => resolve(&derived, candidate),
                Err(reason) => {
                    derived.force_rejected(reason);
                }
            },
            // `target` locked in when it adopted this value.
            Self::Adopt { target } => match settlement {
                Settlement::Fulfilled(value) => propagate(&target, Candidate::Plain(value)),
                Settlement::Rejected(reason) => {
                    target.reject(reason);
                }
            },
        }
    }
}
