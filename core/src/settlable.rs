//! The settlable value state machine.
//!
//! A [`SettlableValue`] is a shared handle: clones refer to the same storage.
//! Storage holds the settled payload (absent while pending) and the FIFO queue
//! of reactions waiting for settlement.
//!
//! Two write-once gates guard it. The `resolved` latch closes on the first
//! public settlement call (`settle_with`, `force_fulfilled`, `force_rejected`),
//! even when that call leaves the value pending because it adopted another
//! value or a thenable. Every later public call is a no-op. The payload slot
//! is written once by whichever path completes the locked-in resolution.
//!
//! ```text
//!   settle_with(pending B)          B settles
//! Pending ─────────────────> Pending, resolved ─────────> Fulfilled | Rejected
//!    │                              │
//!    │ force_*(x)                   │ force_* / settle_with: ignored
//!    v                              v
//! Fulfilled | Rejected            (no effect)
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use deferral_types::{ResolutionError, SettlableId, SettleState, Settlement};

use crate::reaction::{Handlers, Reaction};
use crate::resolution::{Candidate, resolve};
use crate::scheduler::Scheduler;

/// Bound for success values. Payloads are cloned once per drained reaction.
pub trait Payload: Clone + 'static {}

impl<T: Clone + 'static> Payload for T {}

/// Bound for rejection reasons. The resolution procedure must be able to
/// produce one for a self-resolution attempt.
pub trait RejectionReason: Clone + From<ResolutionError> + 'static {}

impl<E: Clone + From<ResolutionError> + 'static> RejectionReason for E {}

struct Shared<T, E> {
    id: SettlableId,
    scheduler: Rc<dyn Scheduler>,
    /// Closed by the first public settlement call.
    resolved: Cell<bool>,
    /// `None` while pending.
    slot: RefCell<Option<Settlement<T, E>>>,
    reactions: RefCell<VecDeque<Reaction<T, E>>>,
}

/// A deferred value that is settled at most once.
///
/// Values are single-threaded; the handle is neither `Send` nor `Sync`:
///
/// ```compile_fail
/// use deferral_core::{Reason, SettlableValue, TaskQueue};
///
/// fn assert_send<S: Send>(_: S) {}
///
/// let value: SettlableValue<i32, Reason> = SettlableValue::new(TaskQueue::new());
/// assert_send(value);
/// ```
pub struct SettlableValue<T, E> {
    shared: Rc<Shared<T, E>>,
}

impl<T, E> Clone for SettlableValue<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T, E> SettlableValue<T, E> {
    /// Create a pending value whose reactions run on `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        let id = SettlableId::next();
        tracing::trace!(id = %id, "Created settlable value");
        Self {
            shared: Rc::new(Shared {
                id,
                scheduler,
                resolved: Cell::new(false),
                slot: RefCell::new(None),
                reactions: RefCell::new(VecDeque::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> SettlableId {
        self.shared.id
    }

    /// Whether both handles refer to the same value.
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    #[must_use]
    pub fn current_state(&self) -> SettleState {
        self.shared
            .slot
            .borrow()
            .as_ref()
            .map_or(SettleState::Pending, Settlement::state)
    }

    /// Whether a settlement call has locked this value in.
    ///
    /// True from the first `settle_with` / `force_*` call on, including while
    /// the value still waits on an adopted value or thenable.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.shared.resolved.get()
    }

    /// Close the resolved latch. Returns `true` only for the first caller.
    pub(crate) fn lock_in(&self) -> bool {
        let first = !self.shared.resolved.replace(true);
        if !first {
            tracing::debug!(
                id = %self.id(),
                state = %self.current_state(),
                "Ignoring settlement of an already resolved value"
            );
        }
        first
    }

    /// Number of reactions registered but not yet drained.
    #[must_use]
    pub fn queued_reactions(&self) -> usize {
        self.shared.reactions.borrow().len()
    }

    #[must_use]
    pub(crate) fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::clone(&self.shared.scheduler)
    }
}

impl<T: Payload, E: RejectionReason> SettlableValue<T, E> {
    /// The settled payload, or `None` while pending.
    #[must_use]
    pub fn current_payload(&self) -> Option<Settlement<T, E>> {
        self.shared.slot.borrow().clone()
    }

    /// Register a reaction and return its derived value.
    ///
    /// The derived value settles with the outcome of whichever handler matches
    /// this value's settlement. A missing handler passes the settlement through
    /// unchanged. Handlers never run before this call returns.
    pub fn register_reaction(&self, handlers: Handlers<T, E>) -> SettlableValue<T, E> {
        let derived = SettlableValue::new(self.scheduler());
        tracing::trace!(
            id = %self.id(),
            derived = %derived.id(),
            "Registered reaction"
        );
        self.enqueue(Reaction::Chained {
            handlers,
            derived: derived.clone(),
        });
        derived
    }

    /// Shorthand for a reaction with only a fulfillment handler.
    pub fn then<F>(&self, on_fulfilled: F) -> SettlableValue<T, E>
    where
        F: FnOnce(T) -> Result<Candidate<T, E>, E> + 'static,
    {
        self.register_reaction(Handlers::new().on_fulfilled(on_fulfilled))
    }

    /// Shorthand for a reaction with only a rejection handler.
    pub fn catch<R>(&self, on_rejected: R) -> SettlableValue<T, E>
    where
        R: FnOnce(E) -> Result<Candidate<T, E>, E> + 'static,
    {
        self.register_reaction(Handlers::new().on_rejected(on_rejected))
    }

    /// Settle this value with an arbitrary candidate via the resolution procedure.
    ///
    /// Ignored once the value is resolved.
    pub fn settle_with(&self, candidate: Candidate<T, E>) {
        resolve(self, candidate);
    }

    /// Fulfill with `value` unless already resolved.
    ///
    /// Returns `true` when this call performed the transition.
    pub fn force_fulfilled(&self, value: T) -> bool {
        self.lock_in() && self.fulfill(value)
    }

    /// Reject with `reason` unless already resolved.
    ///
    /// Returns `true` when this call performed the transition.
    pub fn force_rejected(&self, reason: E) -> bool {
        self.lock_in() && self.reject(reason)
    }

    /// Complete a locked-in resolution with a value.
    pub(crate) fn fulfill(&self, value: T) -> bool {
        self.transition(Settlement::Fulfilled(value))
    }

    /// Complete a locked-in resolution with a reason.
    pub(crate) fn reject(&self, reason: E) -> bool {
        self.transition(Settlement::Rejected(reason))
    }

    pub(crate) fn enqueue(&self, reaction: Reaction<T, E>) {
        self.shared.reactions.borrow_mut().push_back(reaction);
        if self.shared.slot.borrow().is_some() {
            self.schedule_drain();
        }
    }

    fn transition(&self, settlement: Settlement<T, E>) -> bool {
        {
            let mut slot = self.shared.slot.borrow_mut();
            if let Some(existing) = slot.as_ref() {
                tracing::debug!(
                    id = %self.id(),
                    state = %existing.state(),
                    attempted = %settlement.state(),
                    "Ignoring settlement of an already settled value"
                );
                return false;
            }
            tracing::trace!(id = %self.id(), state = %settlement.state(), "Settled");
            *slot = Some(settlement);
        }

        // Registration after this point schedules its own drain.
        if !self.shared.reactions.borrow().is_empty() {
            self.schedule_drain();
        }
        true
    }

    fn schedule_drain(&self) {
        let owner = self.clone();
        self.shared.scheduler.schedule(Box::new(move || owner.drain()));
    }

    /// Run every queued reaction, including ones registered while draining.
    fn drain(&self) {
        let Some(settlement) = self.current_payload() else {
            return;
        };

        let mut drained = 0usize;
        loop {
            // Pop before running so a re-entrant registration cannot see this reaction.
            let next = self.shared.reactions.borrow_mut().pop_front();
            let Some(reaction) = next else {
                break;
            };
            reaction.run(settlement.clone());
            drained += 1;
        }

        tracing::trace!(id = %self.id(), drained, "Drained reactions");
    }
}

impl<T, E> fmt::Debug for SettlableValue<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlableValue")
            .field("id", &self.shared.id)
            .field("state", &self.current_state())
            .field("resolved", &self.is_resolved())
            .field("queued", &self.queued_reactions())
            .finish_non_exhaustive()
    }
}
