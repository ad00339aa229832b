//! Producer-side handle over a settlable value.

use std::fmt;
use std::rc::Rc;

use crate::resolution::Candidate;
use crate::scheduler::Scheduler;
use crate::settlable::{Payload, RejectionReason, SettlableValue};

/// Pairs a settlable value with the entry points that settle it.
///
/// Hand [`promise`](Self::promise) clones to consumers and keep the
/// `Deferred` where the outcome is produced.
pub struct Deferred<T, E> {
    promise: SettlableValue<T, E>,
}

impl<T, E> Deferred<T, E> {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            promise: SettlableValue::new(scheduler),
        }
    }

    #[must_use]
    pub fn promise(&self) -> &SettlableValue<T, E> {
        &self.promise
    }

    #[must_use]
    pub fn into_promise(self) -> SettlableValue<T, E> {
        self.promise
    }
}

impl<T: Payload, E: RejectionReason> Deferred<T, E> {
    /// Settle through the resolution procedure.
    pub fn resolve(&self, candidate: Candidate<T, E>) {
        self.promise.settle_with(candidate);
    }

    pub fn reject(&self, reason: E) {
        self.promise.force_rejected(reason);
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("promise", &self.promise)
            .finish()
    }
}
