//! Rejection reasons.
//!
//! The resolution procedure has exactly one failure of its own: resolving a
//! value with itself. Every other rejection reason comes from user code. Reason
//! types used with the core must be constructible from [`ResolutionError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by the resolution procedure itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// A value was told to resolve with itself.
    #[error("a settlable value cannot be resolved with itself")]
    SelfResolution,
}

/// General-purpose rejection reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Reason {
    /// The candidate had the wrong shape for the operation (self-resolution).
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Failure raised by user code: a continuation, a thenable, or an explicit reject.
    #[error("{0}")]
    Message(String),
}

impl Reason {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::TypeMismatch(message) | Self::Message(message) => message,
        }
    }
}

impl From<ResolutionError> for Reason {
    fn from(err: ResolutionError) -> Self {
        Self::TypeMismatch(err.to_string())
    }
}

impl From<&str> for Reason {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for Reason {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}
