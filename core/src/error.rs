//! Error types for operations tracked by a receiver.
//!
//! None of these errors ever escape a receiver. They exist so the runtime can
//! carry a failure from the place it happened (an `Err` output, a panic) to
//! the single place that turns it into a [`ReceiveState::Failed`] snapshot.
//!
//! [`ReceiveState::Failed`]: crate::ReceiveState::Failed

use std::any::Any;
use std::fmt::Display;
use thiserror::Error;

/// Message used when a receiver is created with an empty default message
pub const FALLBACK_ERROR_MESSAGE: &str = "The operation failed.";

/// Why a tracked operation failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiveError {
    /// The operation's future resolved to an error
    #[error("{0}")]
    OperationFailed(String),

    /// The operation panicked, either while being created or while polled
    #[error("{0}")]
    Panicked(String),
}

impl ReceiveError {
    /// Wrap any displayable error
    pub fn operation_failed(error: impl Display) -> Self {
        Self::OperationFailed(error.to_string())
    }

    /// Build from a panic payload, keeping the message when it is a string
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        Self::Panicked(message)
    }

    /// The carried message, possibly empty
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::OperationFailed(message) | Self::Panicked(message) => message,
        }
    }
}

/// Pick the message a failed snapshot carries.
///
/// An absent or empty message falls back to `default`.
#[must_use]
pub fn normalize_error_message<'a>(message: Option<&'a str>, default: &'a str) -> &'a str {
    match message {
        Some(message) if !message.is_empty() => message,
        _ => default,
    }
}
