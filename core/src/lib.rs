//! Settle-once deferred values.
//!
//! A [`SettlableValue`] starts pending and is settled at most once, with a
//! success value or a rejection reason. The first settlement call locks it in,
//! even if the outcome is still pending on another value. Reactions registered
//! on it (before or after settlement) run later on a [`Scheduler`], never on
//! the caller's stack, and each one yields a derived value that settles with
//! its outcome.
//!
//! ```text
//! settle_with ─> resolution::resolve ─> lock in ─> fulfill | reject
//!                                                        │
//!                                                        v
//!                                          Scheduler::schedule(drain)
//!                                                        │
//!                          drain: pop reaction -> handler -> resolve(derived, result)
//! ```
//!
//! # Example
//!
//! ```
//! use deferral_core::{Candidate, Reason, SettlableValue, SettleState, Settlement, TaskQueue};
//!
//! let queue = TaskQueue::new();
//! let a: SettlableValue<i64, Reason> = SettlableValue::new(queue.clone());
//! let b = a.then(|x| Ok(Candidate::Plain(x * 2)));
//!
//! a.force_fulfilled(21);
//! assert_eq!(b.current_state(), SettleState::Pending);
//!
//! queue.run_until_idle().unwrap();
//! assert_eq!(b.current_payload(), Some(Settlement::Fulfilled(42)));
//! ```

mod deferred;
mod reaction;
pub mod resolution;
pub mod scheduler;
mod settlable;

pub use deferral_types::{Reason, ResolutionError, SettlableId, SettleState, Settlement};
pub use deferred::Deferred;
pub use reaction::{FulfilledHandler, Handlers, RejectedHandler};
pub use resolution::{Candidate, ResolvingFunctions, ThenFn, ThenMember, Thenable};
pub use scheduler::{DEFAULT_TURN_LIMIT, Scheduler, SchedulerError, Task, TaskQueue};
pub use settlable::{Payload, RejectionReason, SettlableValue};
