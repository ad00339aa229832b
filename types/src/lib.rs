//! Core domain types for deferral.
//!
//! This crate contains pure domain types with no IO, no scheduling, and minimal dependencies.
//! Everything here can be used from any layer of the workspace.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod ids;
mod reason;

pub use ids::SettlableId;
pub use reason::{Reason, ResolutionError};

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Settlement State
// ============================================================================

/// Lifecycle state of a settlable value.
///
/// `Pending` is the only non-terminal state. Once a value reaches `Fulfilled`
/// or `Rejected` it stays there.
///
/// # State Machine
/// ```text
///              force_fulfilled(v)   ┌─────────────┐
///           ┌─────────────────────> │ Fulfilled   │
/// ┌─────────┴─┐                     └─────────────┘
/// │ Pending   │
/// └─────────┬─┘                     ┌─────────────┐
///           └─────────────────────> │ Rejected    │
///              force_rejected(r)    └─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleState {
    #[default]
    Pending,
    Fulfilled,
    Rejected,
}

impl SettleState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SettleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Settled Payload
// ============================================================================

/// The payload written exactly once when a value leaves `Pending`.
///
/// There is no pending variant: holding a `Settlement` proves the value was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "payload", rename_all = "lowercase")]
pub enum Settlement<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    #[must_use]
    pub const fn state(&self) -> SettleState {
        match self {
            Self::Fulfilled(_) => SettleState::Fulfilled,
            Self::Rejected(_) => SettleState::Rejected,
        }
    }

    /// The success value, if this settlement is a fulfillment.
    pub fn fulfilled(self) -> Option<T> {
        match self {
            Self::Fulfilled(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    /// The failure reason, if this settlement is a rejection.
    pub fn rejected(self) -> Option<E> {
        match self {
            Self::Fulfilled(_) => None,
            Self::Rejected(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Fulfilled(value) => Ok(value),
            Self::Rejected(reason) => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settlement<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(reason) => Self::Rejected(reason),
        }
    }
}
