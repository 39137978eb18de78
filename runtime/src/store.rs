//! Store runtime for coordinating reducer execution and timer effects.
//!
//! The Store manages:
//! 1. State (behind a mutex, published through an [`Observable`] after every action)
//! 2. Reducer (decision logic)
//! 3. Environment (injected configuration)
//! 4. Effect execution (delayed actions fed back into the reducer)
//!
//! Delayed actions run on spawned tokio tasks that hold only a weak reference
//! to the store. Dropping the store aborts them, so no callback ever reaches
//! a defunct store.

use crate::error::StoreError;
use crate::metrics::{STORE_ACTIONS_PROCESSED, STORE_DELAYS_CANCELLED, STORE_DELAYS_SCHEDULED};
use crate::observable::{Observable, ReadOnlyObservable};
use loadstate_core::effect::Effect;
use loadstate_core::reducer::Reducer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The Store - runtime coordinator for a reducer
///
/// # Example
///
/// ```ignore
/// let store = Store::new(
///     RenderGate::new(&env),
///     RenderGateReducer,
///     env,
/// );
///
/// store.send(GateAction::DominantStateChanged(ReceiveState::Pending))?;
/// let open = store.state(RenderGate::is_open);
/// ```
pub struct Store<R: Reducer> {
    inner: Arc<StoreInner<R>>,
}

struct StoreInner<R: Reducer> {
    name: &'static str,
    state: Mutex<R::State>,
    published: Observable<R::State>,
    reducer: R,
    environment: R::Environment,
    delays: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Clone + Send + Sync + 'static,
    R::Action: Send + 'static,
    R::Environment: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self::named("store", initial_state, reducer, environment)
    }

    /// Create a store whose logs and metrics carry `name`
    #[must_use]
    pub fn named(
        name: &'static str,
        initial_state: R::State,
        reducer: R,
        environment: R::Environment,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                name,
                published: Observable::new(initial_state.clone()),
                state: Mutex::new(initial_state),
                reducer,
                environment,
                delays: Mutex::new(Vec::new()),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Send an action to the store
    ///
    /// 1. Locks state and calls the reducer with (state, action, environment)
    /// 2. Publishes the new state
    /// 3. Executes returned effects
    ///
    /// State changes are visible to readers when `send` returns. Delayed
    /// actions are fed back later on a spawned task.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store was shut down
    /// - [`StoreError::NoRuntime`] if a delay effect was produced outside a
    ///   tokio runtime; the action itself was still applied
    #[tracing::instrument(skip(self, action), fields(store = self.inner.name))]
    pub fn send(&self, action: R::Action) -> Result<(), StoreError> {
        self.inner.send(action)
    }

    /// Read state through a closure
    pub fn state<T>(&self, f: impl FnOnce(&R::State) -> T) -> T {
        f(&lock(&self.inner.state))
    }

    /// Observable copy of the state, updated after every action
    #[must_use]
    pub fn observe(&self) -> ReadOnlyObservable<R::State> {
        self.inner.published.read_only()
    }

    /// Receive a notification after every action
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<R::State> {
        self.inner.published.subscribe()
    }

    /// Number of delayed actions that have not fired yet
    #[must_use]
    pub fn pending_delays(&self) -> usize {
        let mut delays = lock(&self.inner.delays);
        delays.retain(|handle| !handle.is_finished());
        delays.len()
    }

    /// Reject further actions and abort every delayed action
    pub fn shutdown(&self) {
        tracing::debug!(store = self.inner.name, "Store shutting down");
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.cancel_delays();
    }
}

impl<R: Reducer> Drop for Store<R> {
    fn drop(&mut self) {
        for handle in lock(&self.inner.delays).drain(..) {
            handle.abort();
        }
    }
}

impl<R> StoreInner<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Clone + Send + Sync + 'static,
    R::Action: Send + 'static,
    R::Environment: Send + Sync + 'static,
{
    fn send(self: &Arc<Self>, action: R::Action) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(StoreError::ShutdownInProgress);
        }

        let effects = {
            let mut state = lock(&self.state);
            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            self.published.set(state.clone());
            effects
        };
        metrics::counter!(STORE_ACTIONS_PROCESSED, "store" => self.name).increment(1);

        let mut result = Ok(());
        for effect in effects {
            if let Err(error) = self.execute(effect) {
                result = Err(error);
            }
        }
        result
    }

    fn execute(self: &Arc<Self>, effect: Effect<R::Action>) -> Result<(), StoreError> {
        match effect {
            Effect::None => Ok(()),
            Effect::Cancel => {
                self.cancel_delays();
                Ok(())
            },
            Effect::Delay { duration, action } => self.schedule(duration, *action),
        }
    }

    fn schedule(self: &Arc<Self>, duration: Duration, action: R::Action) -> Result<(), StoreError> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(store = self.name, "Delayed action dropped: no tokio runtime");
            return Err(StoreError::NoRuntime);
        };

        let store: Weak<Self> = Arc::downgrade(self);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(store) = store.upgrade() {
                if let Err(error) = store.send(action) {
                    tracing::debug!(error = %error, "Delayed action not delivered");
                }
            }
        });

        tracing::trace!(store = self.name, delay_ms = duration.as_millis(), "Delayed action scheduled");
        metrics::counter!(STORE_DELAYS_SCHEDULED, "store" => self.name).increment(1);

        let mut delays = lock(&self.delays);
        delays.retain(|handle| !handle.is_finished());
        delays.push(handle);
        Ok(())
    }

    fn cancel_delays(&self) {
        let handles: Vec<_> = lock(&self.delays).drain(..).collect();
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                metrics::counter!(STORE_DELAYS_CANCELLED, "store" => self.name).increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadstate_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct TestState {
        value: i32,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        IncrementLater,
        CancelAll,
    }

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::IncrementLater => smallvec![Effect::delay(
                    Duration::from_millis(100),
                    TestAction::Increment
                )],
                TestAction::CancelAll => smallvec![Effect::Cancel],
            }
        }
    }

    #[test]
    fn test_send_updates_state_synchronously() {
        let store = Store::new(TestState::default(), TestReducer, ());
        assert_eq!(store.send(TestAction::Increment), Ok(()));

        assert_eq!(store.state(|s| s.value), 1);
        assert_eq!(store.observe().get().value, 1);
    }

    #[test]
    fn test_delay_outside_runtime_reports_error() {
        let store = Store::new(TestState::default(), TestReducer, ());
        assert_eq!(store.send(TestAction::IncrementLater), Err(StoreError::NoRuntime));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_feeds_action_back() {
        let store = Store::new(TestState::default(), TestReducer, ());
        assert_eq!(store.send(TestAction::IncrementLater), Ok(()));
        assert_eq!(store.pending_delays(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.state(|s| s.value), 1);
        assert_eq!(store.pending_delays(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_delays() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let _ = store.send(TestAction::IncrementLater);
        let _ = store.send(TestAction::CancelAll);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.state(|s| s.value), 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_actions() {
        let store = Store::new(TestState::default(), TestReducer, ());
        store.shutdown();

        assert_eq!(
            store.send(TestAction::Increment),
            Err(StoreError::ShutdownInProgress)
        );
    }
}
