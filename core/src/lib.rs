//! # Loadstate Core
//!
//! Core types for tracking the lifecycle of asynchronous operations.
//!
//! This crate holds everything that can be expressed without a runtime:
//! the receive states an operation moves through, the immutable snapshots a
//! receiver publishes, the pure aggregation functions that reduce many
//! snapshots into one decision, and the render gate reducer that decides when
//! a transient "loading" state may become visible.
//!
//! ## Core Concepts
//!
//! - **ReceiveState**: Where one operation stands (`NotStarted`, `Pending`, `Received`, `Failed`, `Unloaded`)
//! - **Snapshot**: Immutable point-in-time value of a receiver's state, error and result
//! - **Dominant state**: The single aggregate state chosen from N snapshots via fixed priority
//! - **Render gate**: Debounce policy delaying visibility of transient states
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (timers), executed by the runtime
//!
//! ## Example
//!
//! ```
//! use loadstate_core::{dominant_state, ReceiveState, ReceiverSnapshot};
//!
//! let snapshots = vec![
//!     ReceiverSnapshot::received(1),
//!     ReceiverSnapshot::received(2),
//!     ReceiverSnapshot::pending(),
//! ];
//!
//! assert_eq!(dominant_state(&snapshots), ReceiveState::Pending);
//! ```

pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Aggregation of many snapshots into counts and a dominant state
pub mod aggregate;

/// Presentation branch selection
pub mod branch;

/// Error types and failure message normalization
pub mod error;

/// Render-threshold gate reducer
pub mod gate;

/// Receive states and snapshots
pub mod state;

pub use aggregate::{
    AggregateCounts, DEFAULT_PRIORITY_ORDER, DefaultPolicy, DeterminePolicy, PriorityOrder,
    counts_by_state, dominant_state, dominant_state_with, error_messages, received_results,
};
pub use branch::{LoadingBranch, select_branch};
pub use error::{FALLBACK_ERROR_MESSAGE, ReceiveError, normalize_error_message};
pub use gate::{GateAction, GateEnvironment, RenderGate, RenderGateReducer};
pub use state::{ReceiveState, ReceiverSnapshot, SnapshotSummary, StateView};

/// Reducer module - The core trait for state transitions driven by actions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain the decision logic and are deterministic and testable without
/// a runtime. The runtime crate executes the returned effects.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected configuration this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for RenderGateReducer {
    ///     type State = RenderGate;
    ///     type Action = GateAction;
    ///     type Environment = GateEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut RenderGate,
    ///         action: GateAction,
    ///         env: &GateEnvironment,
    ///     ) -> SmallVec<[Effect<GateAction>; 4]> {
    ///         smallvec![Effect::None]
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// The effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution), returned from reducers.
pub mod effect {
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the runtime Store.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Delayed action (debounce timers)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Cancel every delayed action that has not fired yet
        Cancel,
    }

    impl<Action> Effect<Action> {
        /// Build a delayed action
        #[must_use]
        pub fn delay(duration: Duration, action: Action) -> Self {
            Self::Delay {
                duration,
                action: Box::new(action),
            }
        }

        /// Returns `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }
    }
}
