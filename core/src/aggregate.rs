//! Reduce many receiver snapshots into one decision.
//!
//! Every function here is pure and total: any slice, including an empty one,
//! produces an answer.

use crate::state::{ReceiveState, ReceiverSnapshot, StateView};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::Index;
use std::sync::Arc;

/// Default priority used to pick a dominant state.
///
/// A single failure surfaces first, then in-flight work, then operations that
/// were never started or were unloaded. `Received` wins only when every
/// snapshot is received.
pub const DEFAULT_PRIORITY_ORDER: [ReceiveState; 5] = [
    ReceiveState::Failed,
    ReceiveState::Pending,
    ReceiveState::NotStarted,
    ReceiveState::Unloaded,
    ReceiveState::Received,
];

/// Number of snapshots in each state. All five states are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateCounts {
    counts: [usize; 5],
}

impl AggregateCounts {
    /// Count for one state
    #[must_use]
    pub const fn get(&self, state: ReceiveState) -> usize {
        self.counts[state.index()]
    }

    /// Sum over all states
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(state, count)` pairs in declaration order, zeros included
    pub fn iter(&self) -> impl Iterator<Item = (ReceiveState, usize)> + '_ {
        ReceiveState::ALL.iter().map(|&state| (state, self.get(state)))
    }

    fn increment(&mut self, state: ReceiveState) {
        self.counts[state.index()] += 1;
    }
}

impl Index<ReceiveState> for AggregateCounts {
    type Output = usize;

    fn index(&self, state: ReceiveState) -> &usize {
        &self.counts[state.index()]
    }
}

/// Count snapshots by state.
#[must_use]
pub fn counts_by_state<S: StateView>(snapshots: &[S]) -> AggregateCounts {
    snapshots
        .iter()
        .fold(AggregateCounts::default(), |mut counts, snapshot| {
            counts.increment(snapshot.state());
            counts
        })
}

/// Dominant state under [`DEFAULT_PRIORITY_ORDER`]. Empty input yields `NotStarted`.
#[must_use]
pub fn dominant_state<S: StateView>(snapshots: &[S]) -> ReceiveState {
    DefaultPolicy.determine(snapshots)
}

/// Dominant state under a caller-supplied policy.
pub fn dominant_state_with<S, P>(snapshots: &[S], policy: &P) -> ReceiveState
where
    P: DeterminePolicy<S> + ?Sized,
{
    policy.determine(snapshots)
}

/// A strategy that reduces snapshots to one state.
///
/// Plain closures `Fn(&[S]) -> ReceiveState` are policies, so
/// `dominant_state_with(&snapshots, &|_: &[_]| ReceiveState::Received)` works.
pub trait DeterminePolicy<S> {
    /// Pick the aggregate state
    fn determine(&self, snapshots: &[S]) -> ReceiveState;
}

impl<S, F> DeterminePolicy<S> for F
where
    F: Fn(&[S]) -> ReceiveState,
{
    fn determine(&self, snapshots: &[S]) -> ReceiveState {
        self(snapshots)
    }
}

/// The default policy: [`DEFAULT_PRIORITY_ORDER`] with a `NotStarted` fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl<S: StateView> DeterminePolicy<S> for DefaultPolicy {
    fn determine(&self, snapshots: &[S]) -> ReceiveState {
        resolve(&DEFAULT_PRIORITY_ORDER, ReceiveState::NotStarted, &counts_by_state(snapshots))
    }
}

/// A custom priority order used as a policy.
///
/// The first state in `order` with a non-zero count wins; `fallback` is used
/// when none has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityOrder {
    order: SmallVec<[ReceiveState; 5]>,
    fallback: ReceiveState,
}

impl Default for PriorityOrder {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_ORDER)
    }
}

impl PriorityOrder {
    /// Priority order with the `NotStarted` fallback
    pub fn new(order: impl IntoIterator<Item = ReceiveState>) -> Self {
        Self {
            order: order.into_iter().collect(),
            fallback: ReceiveState::NotStarted,
        }
    }

    /// Replace the fallback state
    #[must_use]
    pub const fn with_fallback(mut self, fallback: ReceiveState) -> Self {
        self.fallback = fallback;
        self
    }

    /// Apply the order to precomputed counts
    #[must_use]
    pub fn resolve(&self, counts: &AggregateCounts) -> ReceiveState {
        resolve(&self.order, self.fallback, counts)
    }
}

impl<S: StateView> DeterminePolicy<S> for PriorityOrder {
    fn determine(&self, snapshots: &[S]) -> ReceiveState {
        self.resolve(&counts_by_state(snapshots))
    }
}

fn resolve(order: &[ReceiveState], fallback: ReceiveState, counts: &AggregateCounts) -> ReceiveState {
    order
        .iter()
        .copied()
        .find(|&state| counts.get(state) > 0)
        .unwrap_or(fallback)
}

/// Every non-empty error message, in snapshot order.
#[must_use]
pub fn error_messages<S: StateView>(snapshots: &[S]) -> Vec<String> {
    snapshots
        .iter()
        .map(StateView::error_message)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .collect()
}

/// All results, when every snapshot holds one.
#[must_use]
pub fn received_results<T>(snapshots: &[ReceiverSnapshot<T>]) -> Option<Vec<Arc<T>>> {
    snapshots
        .iter()
        .map(|snapshot| snapshot.shared_result().cloned())
        .collect()
}
