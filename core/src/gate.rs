//! Render-threshold gate.
//!
//! The gate decides whether a transient aggregate state (`Pending`, and
//! `NotStarted` once a cycle has begun) is allowed to become visible. Fast
//! operations that settle before the threshold never show a loading branch.
//!
//! | dominant state | gate |
//! |----------------|------|
//! | no threshold configured | open |
//! | `Failed` / `Received` | open now, timer cancelled |
//! | `Unloaded` | closed now, timer cancelled |
//! | `Pending` | unchanged if open, otherwise arm a timer that opens it |
//! | `NotStarted` | unchanged |
//!
//! Any change of dominant state cancels an armed timer. Timer expiries carry
//! the epoch they were armed in, so an expiry that races a cancellation is
//! ignored.

use crate::effect::Effect;
use crate::reducer::Reducer;
use crate::state::ReceiveState;
use smallvec::{SmallVec, smallvec};
use std::time::Duration;

/// Inputs of the gate reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    /// The aggregate state was recomputed
    DominantStateChanged(ReceiveState),
    /// A timer armed in `epoch` fired
    ThresholdElapsed {
        /// Epoch the timer was armed in
        epoch: u64,
    },
}

/// Configuration the gate reducer reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateEnvironment {
    /// Delay before a transient state is shown; `None` shows everything at once
    pub minimum_render_threshold: Option<Duration>,
}

impl GateEnvironment {
    /// Environment with an optional threshold
    #[must_use]
    pub const fn new(minimum_render_threshold: Option<Duration>) -> Self {
        Self {
            minimum_render_threshold,
        }
    }
}

/// State of one gate. Local to a single aggregation subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderGate {
    passed_threshold: bool,
    armed_epoch: Option<u64>,
    epoch: u64,
    last_state: Option<ReceiveState>,
}

impl RenderGate {
    /// Initial gate for an environment: open when no threshold is configured
    #[must_use]
    pub const fn new(env: &GateEnvironment) -> Self {
        Self {
            passed_threshold: env.minimum_render_threshold.is_none(),
            armed_epoch: None,
            epoch: 0,
            last_state: None,
        }
    }

    /// Whether transient states may render
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.passed_threshold
    }

    /// Whether a timer is currently armed
    #[must_use]
    pub const fn is_timer_armed(&self) -> bool {
        self.armed_epoch.is_some()
    }

    /// Last dominant state observed
    #[must_use]
    pub const fn last_state(&self) -> Option<ReceiveState> {
        self.last_state
    }
}

/// Reducer driving a [`RenderGate`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderGateReducer;

impl Reducer for RenderGateReducer {
    type State = RenderGate;
    type Action = GateAction;
    type Environment = GateEnvironment;

    fn reduce(
        &self,
        gate: &mut RenderGate,
        action: GateAction,
        env: &GateEnvironment,
    ) -> SmallVec<[Effect<GateAction>; 4]> {
        match action {
            GateAction::DominantStateChanged(state) => {
                if gate.last_state == Some(state) {
                    return smallvec![Effect::None];
                }
                gate.last_state = Some(state);

                let mut effects: SmallVec<[Effect<GateAction>; 4]> = SmallVec::new();
                if gate.armed_epoch.take().is_some() {
                    effects.push(Effect::Cancel);
                }

                match (env.minimum_render_threshold, state) {
                    (None, _) | (_, ReceiveState::Failed | ReceiveState::Received) => {
                        gate.passed_threshold = true;
                    },
                    (_, ReceiveState::Unloaded) => gate.passed_threshold = false,
                    (Some(threshold), ReceiveState::Pending) => {
                        if !gate.passed_threshold {
                            gate.epoch += 1;
                            gate.armed_epoch = Some(gate.epoch);
                            effects.push(Effect::delay(
                                threshold,
                                GateAction::ThresholdElapsed { epoch: gate.epoch },
                            ));
                        }
                    },
                    (_, ReceiveState::NotStarted) => {},
                }

                if effects.is_empty() {
                    effects.push(Effect::None);
                }
                effects
            },
            GateAction::ThresholdElapsed { epoch } => {
                if gate.armed_epoch == Some(epoch) {
                    gate.armed_epoch = None;
                    gate.passed_threshold = true;
                }
                smallvec![Effect::None]
            },
        }
    }
}
