//! The resolution procedure.
//!
//! [`resolve`] decides how a candidate settles a target value:
//!
//! ```text
//! candidate                        effect on target
//! ──────────────────────────────   ───────────────────────────────────────────
//! (target already resolved)        none
//! Settlable(target itself)         reject with ResolutionError::SelfResolution
//! Settlable(pending)               wait; mirror its settlement when it comes
//! Settlable(settled)               copy its settlement now
//! Thenable, `then` read fails      reject with the read failure
//! Thenable, `then` not callable    fulfill with the thenable's plain value
//! Thenable, `then` callable        call it; first resolve/reject callback wins
//! Plain                            fulfill with the value
//! ```
//!
//! The first call locks the target in, even when the candidate leaves it
//! pending. Later calls, including `force_*`, cannot override the adopted
//! outcome.
//!
//! Shapes are decided where a value enters the system: whoever builds a
//! [`Candidate`] picks the variant, so the procedure dispatches on the tag and
//! never probes values at runtime.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use deferral_types::{ResolutionError, Settlement};

use crate::reaction::Reaction;
use crate::settlable::{Payload, RejectionReason, SettlableValue};

/// A value offered to the resolution procedure.
pub enum Candidate<T, E> {
    /// An ordinary value; fulfills the target directly.
    Plain(T),
    /// A value native to this crate; the target adopts its settlement.
    Settlable(SettlableValue<T, E>),
    /// A foreign value exposing a `then`-like member.
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> Candidate<T, E> {
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Self::Thenable(Rc::new(thenable))
    }
}

impl<T, E> From<SettlableValue<T, E>> for Candidate<T, E> {
    fn from(value: SettlableValue<T, E>) -> Self {
        Self::Settlable(value)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Candidate<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Self::Settlable(value) => f.debug_tuple("Settlable").field(value).finish(),
            Self::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// Capability of foreign values that take part in resolution.
///
/// Implementors model the two observable steps of interop: reading the `then`
/// member (which may fail) and calling it (which may also fail).
pub trait Thenable<T, E> {
    /// Read the `then` member. `Err` means the read itself failed.
    fn then_member(&self) -> Result<ThenMember<T, E>, E>;
}

/// A callable `then`: receives the resolving functions bound to the target.
///
/// The function may call them synchronously, stash them and call them later,
/// or call them any number of times; only the first call has an effect.
/// Returning `Err` after a callback already fired is ignored.
pub type ThenFn<T, E> = Box<dyn FnOnce(ResolvingFunctions<T, E>) -> Result<(), E>>;

/// Result of reading a thenable's `then` member.
pub enum ThenMember<T, E> {
    Callable(ThenFn<T, E>),
    /// The member exists but cannot be called; the target fulfills with this value.
    NotCallable(T),
}

impl<T, E> ThenMember<T, E> {
    pub fn callable<F>(then: F) -> Self
    where
        F: FnOnce(ResolvingFunctions<T, E>) -> Result<(), E> + 'static,
    {
        Self::Callable(Box::new(then))
    }
}

/// The resolve/reject callback pair handed to a foreign `then`.
///
/// Clones share one latch: across every clone and both callbacks, only the
/// first invocation settles the target.
pub struct ResolvingFunctions<T, E> {
    target: SettlableValue<T, E>,
    called: Rc<Cell<bool>>,
}

impl<T, E> Clone for ResolvingFunctions<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            called: Rc::clone(&self.called),
        }
    }
}

impl<T, E> ResolvingFunctions<T, E> {
    fn new(target: SettlableValue<T, E>) -> Self {
        Self {
            target,
            called: Rc::new(Cell::new(false)),
        }
    }

    /// Whether either callback has already fired.
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.called.get()
    }

    /// Close the latch. Returns `true` only for the first caller.
    fn latch(&self) -> bool {
        !self.called.replace(true)
    }
}

impl<T: Payload, E: RejectionReason> ResolvingFunctions<T, E> {
    /// Resolve the target with `candidate`, recursively.
    pub fn resolve(&self, candidate: Candidate<T, E>) {
        if self.latch() {
            propagate(&self.target, candidate);
        } else {
            tracing::debug!(id = %self.target.id(), "Ignoring repeated thenable resolve");
        }
    }

    /// Reject the target with `reason`.
    pub fn reject(&self, reason: E) {
        if self.latch() {
            self.target.reject(reason);
        } else {
            tracing::debug!(id = %self.target.id(), "Ignoring repeated thenable reject");
        }
    }
}

impl<T, E> fmt::Debug for ResolvingFunctions<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvingFunctions")
            .field("target", &self.target.id())
            .field("called", &self.called.get())
            .finish()
    }
}

/// Lock `target` in and propagate `candidate` into it.
///
/// A no-op when `target` is already resolved. All failures become a rejection
/// of `target`; nothing escapes to the caller.
pub fn resolve<T: Payload, E: RejectionReason>(
    target: &SettlableValue<T, E>,
    candidate: Candidate<T, E>,
) {
    if target.lock_in() {
        propagate(target, candidate);
    }
}

/// Settle a locked-in `target` from `candidate`, recursing through adopted
/// values and thenables.
pub(crate) fn propagate<T: Payload, E: RejectionReason>(
    target: &SettlableValue<T, E>,
    candidate: Candidate<T, E>,
) {
    match candidate {
        Candidate::Settlable(inner) if inner.same_value(target) => {
            tracing::debug!(id = %target.id(), "Rejecting self-resolution");
            target.reject(E::from(ResolutionError::SelfResolution));
        }
        Candidate::Settlable(inner) => adopt(target, &inner),
        Candidate::Thenable(thenable) => follow_thenable(target, thenable.as_ref()),
        Candidate::Plain(value) => {
            target.fulfill(value);
        }
    }
}

fn adopt<T: Payload, E: RejectionReason>(
    target: &SettlableValue<T, E>,
    inner: &SettlableValue<T, E>,
) {
    match inner.current_payload() {
        None => {
            tracing::trace!(id = %target.id(), inner = %inner.id(), "Waiting on pending value");
            inner.enqueue(Reaction::Adopt {
                target: target.clone(),
            });
        }
        Some(Settlement::Fulfilled(value)) => {
            target.fulfill(value);
        }
        Some(Settlement::Rejected(reason)) => {
            target.reject(reason);
        }
    }
}

fn follow_thenable<T: Payload, E: RejectionReason>(
    target: &SettlableValue<T, E>,
    thenable: &dyn Thenable<T, E>,
) {
    let member = match thenable.then_member() {
        Ok(member) => member,
        Err(reason) => {
            target.reject(reason);
            return;
        }
    };

    match member {
        ThenMember::NotCallable(value) => {
            target.fulfill(value);
        }
        ThenMember::Callable(then) => {
            let functions = ResolvingFunctions::new(target.clone());
            if let Err(reason) = then(functions.clone()) {
                if functions.latch() {
                    target.reject(reason);
                } else {
                    tracing::debug!(
                        id = %target.id(),
                        "Swallowing thenable failure after a callback already fired"
                    );
                }
            }
        }
    }
}
