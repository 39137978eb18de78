//! Which branch a presentation layer should render.

use crate::aggregate::error_messages;
use crate::state::{ReceiveState, StateView};
use serde::{Deserialize, Serialize};

/// The branch selected for a dominant state and gate position.
///
/// `Unloaded` is never gated. Callers without a dedicated unloaded view
/// usually render their not-started view for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadingBranch {
    /// At least one operation failed; every non-empty message, in order
    Failed {
        /// Collected error messages
        errors: Vec<String>,
    },
    /// Every operation produced a result
    Received,
    /// Nothing started yet and the gate is open
    NotStarted,
    /// Results were released
    Unloaded,
    /// Work is in flight and the gate is open
    Pending,
    /// A transient state that has not passed the render threshold
    Hidden,
}

impl LoadingBranch {
    /// `false` only for [`LoadingBranch::Hidden`]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// Select the branch to render.
#[must_use]
pub fn select_branch<S: StateView>(
    dominant: ReceiveState,
    gate_open: bool,
    snapshots: &[S],
) -> LoadingBranch {
    match dominant {
        ReceiveState::Failed => LoadingBranch::Failed {
            errors: error_messages(snapshots),
        },
        ReceiveState::Received => LoadingBranch::Received,
        ReceiveState::Unloaded => LoadingBranch::Unloaded,
        ReceiveState::NotStarted if gate_open => LoadingBranch::NotStarted,
        ReceiveState::Pending if gate_open => LoadingBranch::Pending,
        ReceiveState::NotStarted | ReceiveState::Pending => LoadingBranch::Hidden,
    }
}
