//! Receive states and the immutable snapshots a receiver publishes.
//!
//! A [`ReceiverSnapshot`] is never mutated in place. Every transition builds a
//! fresh snapshot and replaces the previous one in the owning cell, so a
//! reader always sees a consistent `(state, error_message, result)` triple.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a single asynchronous operation stands.
///
/// The declaration order carries no meaning. Aggregation uses an explicit
/// priority order instead (see [`crate::aggregate::DEFAULT_PRIORITY_ORDER`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReceiveState {
    /// Nothing has been requested yet
    #[default]
    NotStarted,
    /// An operation is in flight
    Pending,
    /// The operation produced a result
    Received,
    /// The operation failed
    Failed,
    /// The result was explicitly released
    Unloaded,
}

impl ReceiveState {
    /// Every state, in declaration order
    pub const ALL: [Self; 5] = [
        Self::NotStarted,
        Self::Pending,
        Self::Received,
        Self::Failed,
        Self::Unloaded,
    ];

    /// Dense index in `0..5`, used for enum-keyed counting
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::NotStarted => 0,
            Self::Pending => 1,
            Self::Received => 2,
            Self::Failed => 3,
            Self::Unloaded => 4,
        }
    }

    /// `true` while an operation is in flight
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// `true` for the states a presentation layer shows without delay
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Received | Self::Failed)
    }

    /// Stable name of the state
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::Received => "received",
            Self::Failed => "failed",
            Self::Unloaded => "unloaded",
        }
    }
}

impl fmt::Display for ReceiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to the parts of a snapshot that aggregation needs.
///
/// Implemented for typed snapshots, for [`SnapshotSummary`] and for bare
/// [`ReceiveState`] values, so heterogeneous receivers can be aggregated
/// through `&dyn StateView`.
pub trait StateView {
    /// Current state
    fn state(&self) -> ReceiveState;

    /// Error message, empty unless the state is [`ReceiveState::Failed`]
    fn error_message(&self) -> &str {
        ""
    }
}

impl<S: StateView + ?Sized> StateView for &S {
    fn state(&self) -> ReceiveState {
        (**self).state()
    }

    fn error_message(&self) -> &str {
        (**self).error_message()
    }
}

impl StateView for ReceiveState {
    fn state(&self) -> ReceiveState {
        *self
    }
}

/// Immutable point-in-time value of a receiver.
///
/// `result` is present only in [`ReceiveState::Received`]; `error_message` is
/// non-empty only in [`ReceiveState::Failed`]. The constructors are the only
/// way to build a snapshot, which keeps that invariant.
///
/// Results are held behind an [`Arc`] so cloning a snapshot never clones the
/// payload.
#[derive(Debug, PartialEq, Eq)]
pub struct ReceiverSnapshot<T> {
    state: ReceiveState,
    error_message: String,
    result: Option<Arc<T>>,
}

impl<T> Clone for ReceiverSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            error_message: self.error_message.clone(),
            result: self.result.clone(),
        }
    }
}

impl<T> Default for ReceiverSnapshot<T> {
    fn default() -> Self {
        Self::not_started()
    }
}

impl<T> ReceiverSnapshot<T> {
    const fn empty(state: ReceiveState) -> Self {
        Self {
            state,
            error_message: String::new(),
            result: None,
        }
    }

    /// Initial snapshot of every receiver
    #[must_use]
    pub const fn not_started() -> Self {
        Self::empty(ReceiveState::NotStarted)
    }

    /// Snapshot written when an operation starts
    #[must_use]
    pub const fn pending() -> Self {
        Self::empty(ReceiveState::Pending)
    }

    /// Snapshot written by a reset
    #[must_use]
    pub const fn unloaded() -> Self {
        Self::empty(ReceiveState::Unloaded)
    }

    /// Snapshot holding a result
    #[must_use]
    pub fn received(data: T) -> Self {
        Self::received_shared(Arc::new(data))
    }

    /// Snapshot holding an already shared result
    #[must_use]
    pub const fn received_shared(data: Arc<T>) -> Self {
        Self {
            state: ReceiveState::Received,
            error_message: String::new(),
            result: Some(data),
        }
    }

    /// Snapshot holding a failure message
    ///
    /// The message is taken as given. Receivers normalize it against their
    /// default message before building the snapshot.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: ReceiveState::Failed,
            error_message: message.into(),
            result: None,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ReceiveState {
        self.state
    }

    /// Error message (empty unless failed)
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Result (present only when received)
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        self.result.as_deref()
    }

    /// Shared handle to the result
    #[must_use]
    pub const fn shared_result(&self) -> Option<&Arc<T>> {
        self.result.as_ref()
    }

    /// `true` while an operation is in flight
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Type-erased copy of the state and error message
    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            state: self.state,
            error_message: self.error_message.clone(),
        }
    }
}

impl<T> StateView for ReceiverSnapshot<T> {
    fn state(&self) -> ReceiveState {
        self.state
    }

    fn error_message(&self) -> &str {
        &self.error_message
    }
}

/// A snapshot without its typed result.
///
/// Used wherever receivers of different result types are aggregated together.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Current state
    pub state: ReceiveState,
    /// Error message (empty unless failed)
    pub error_message: String,
}

impl StateView for SnapshotSummary {
    fn state(&self) -> ReceiveState {
        self.state
    }

    fn error_message(&self) -> &str {
        &self.error_message
    }
}
