//! Render-threshold controller.
//!
//! Runs the [`RenderGateReducer`] in a [`Store`], which turns the reducer's
//! delay effects into tokio timers. Each controller owns its gate and its
//! timer; dropping the controller clears the timer.

use crate::config::LoadingConfig;
use crate::error::StoreError;
use crate::metrics::RENDER_GATE_OPENED;
use crate::observable::ReadOnlyObservable;
use crate::store::Store;
use loadstate_core::{GateAction, GateEnvironment, ReceiveState, RenderGate, RenderGateReducer};
use std::time::Duration;
use tokio::sync::watch;

/// Debounce gate for one aggregation subscription.
///
/// # Example
///
/// ```no_run
/// use loadstate_runtime::RenderThreshold;
/// use loadstate_core::ReceiveState;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), loadstate_runtime::StoreError> {
/// let threshold = RenderThreshold::new(Some(Duration::from_millis(200)));
/// threshold.observe(ReceiveState::Pending)?;
/// assert!(!threshold.is_open());
///
/// tokio::time::sleep(Duration::from_millis(250)).await;
/// assert!(threshold.is_open());
/// # Ok(())
/// # }
/// ```
pub struct RenderThreshold {
    store: Store<RenderGateReducer>,
}

impl std::fmt::Debug for RenderThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThreshold")
            .field("gate", &self.gate())
            .finish_non_exhaustive()
    }
}

impl RenderThreshold {
    /// Controller for an optional threshold; `None` keeps the gate open
    #[must_use]
    pub fn new(minimum_render_threshold: Option<Duration>) -> Self {
        let env = GateEnvironment::new(minimum_render_threshold);
        Self {
            store: Store::named("render_gate", RenderGate::new(&env), RenderGateReducer, env),
        }
    }

    /// Controller configured from a [`LoadingConfig`]
    #[must_use]
    pub fn from_config(config: &LoadingConfig) -> Self {
        Self::new(config.minimum_render_threshold)
    }

    /// Feed the current dominant state.
    ///
    /// Repeating the last observed state is a no-op.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] after [`RenderThreshold::shutdown`]
    /// - [`StoreError::NoRuntime`] if a timer had to be armed outside a tokio
    ///   runtime; the gate then stays closed until the next terminal state
    pub fn observe(&self, dominant: ReceiveState) -> Result<(), StoreError> {
        let before = self.gate();
        if before.last_state() == Some(dominant) {
            return Ok(());
        }

        let was_open = before.is_open();
        let result = self.store.send(GateAction::DominantStateChanged(dominant));

        let gate = self.gate();
        tracing::trace!(
            dominant = %dominant,
            open = gate.is_open(),
            timer_armed = gate.is_timer_armed(),
            "render gate observed dominant state"
        );
        if !was_open && gate.is_open() {
            metrics::counter!(RENDER_GATE_OPENED).increment(1);
        }
        result
    }

    /// Whether transient states may render
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.store.state(RenderGate::is_open)
    }

    /// Current gate state
    #[must_use]
    pub fn gate(&self) -> RenderGate {
        self.store.state(|gate| *gate)
    }

    /// Observable gate, updated on every transition including timer expiry
    #[must_use]
    pub fn observable(&self) -> ReadOnlyObservable<RenderGate> {
        self.store.observe()
    }

    /// Receive a notification on every gate transition
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RenderGate> {
        self.store.subscribe()
    }

    /// Clear any armed timer and stop accepting states
    pub fn shutdown(&self) {
        self.store.shutdown();
    }
}
