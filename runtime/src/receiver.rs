//! Lifecycle of one asynchronous operation.
//!
//! A [`Receiver`] owns one observable cell of [`ReceiverSnapshot`]s and a
//! generation counter. Every call that resets the state (`start`, `succeeded`,
//! `failed`, `reset`) advances the generation. A future launched by
//! [`Receiver::start_with`] remembers the generation it was started in and
//! only writes its outcome if that generation is still current, so results of
//! superseded or reset operations are dropped.
//!
//! ```text
//! NotStarted|Received|Failed|Unloaded --start--> Pending
//! Pending --start--> Pending (no-op)
//! any --succeeded--> Received
//! any --failed--> Failed
//! any --reset--> Unloaded
//! ```

use crate::metrics::{
    RECEIVER_SETTLED, RECEIVER_STALE_SUPPRESSED, RECEIVER_START_IGNORED, RECEIVER_STARTED,
};
use crate::observable::{Computed, Observable, ReadOnlyObservable};
use futures::FutureExt;
use loadstate_core::{
    FALLBACK_ERROR_MESSAGE, ReceiveError, ReceiveState, ReceiverSnapshot, normalize_error_message,
};
use std::fmt::{self, Display};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

/// Owner of one asynchronous operation's lifecycle state.
///
/// Cloning a `Receiver` yields another handle to the same state machine.
///
/// # Example
///
/// ```no_run
/// use loadstate_runtime::Receiver;
/// use loadstate_core::ReceiveState;
///
/// # async fn example() {
/// let receiver = Receiver::<u32>::new("Could not load the count.")
///     .start_with(|| async { Ok::<_, std::io::Error>(42) });
///
/// let snapshot = receiver.wait_settled().await;
/// assert_eq!(snapshot.state(), ReceiveState::Received);
/// assert_eq!(snapshot.result(), Some(&42));
/// # }
/// ```
pub struct Receiver<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    data: Observable<ReceiverSnapshot<T>>,
    generation: Mutex<u64>,
    default_error: String,
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("data", &self.inner.data)
            .field("generation", &*self.inner.lock_generation())
            .field("default_error", &self.inner.default_error)
            .finish()
    }
}

impl<T> Inner<T> {
    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the generation and publish `snapshot` while holding the lock.
    fn write(&self, generation: &mut u64, snapshot: ReceiverSnapshot<T>) {
        *generation += 1;
        tracing::debug!(generation = *generation, state = %snapshot.state(), "receiver state changed");
        self.data.set(snapshot);
    }

    fn failed_snapshot(&self, message: Option<&str>) -> ReceiverSnapshot<T> {
        ReceiverSnapshot::failed(normalize_error_message(message, &self.default_error))
    }

    /// Apply the outcome of a future started in `started_in`, unless superseded.
    fn settle(&self, started_in: u64, outcome: Result<T, ReceiveError>) {
        let mut generation = self.lock_generation();
        if *generation != started_in {
            tracing::debug!(
                started_in,
                current = *generation,
                "ignoring settlement of a superseded operation"
            );
            metrics::counter!(RECEIVER_STALE_SUPPRESSED).increment(1);
            return;
        }

        let snapshot = match outcome {
            Ok(data) => {
                metrics::counter!(RECEIVER_SETTLED, "outcome" => "received").increment(1);
                ReceiverSnapshot::received(data)
            },
            Err(error) => {
                if matches!(error, ReceiveError::Panicked(_)) {
                    tracing::warn!(error = %error, "tracked operation panicked");
                }
                metrics::counter!(RECEIVER_SETTLED, "outcome" => "failed").increment(1);
                self.failed_snapshot(Some(error.message()))
            },
        };
        self.write(&mut generation, snapshot);
    }
}

impl<T> Receiver<T>
where
    T: Send + Sync + 'static,
{
    /// Create a receiver in `NotStarted` with the message used for failures
    /// that carry none.
    ///
    /// An empty `default_error` is replaced by [`FALLBACK_ERROR_MESSAGE`], so
    /// a `Failed` snapshot never carries an empty message.
    pub fn new(default_error: impl Into<String>) -> Self {
        let mut default_error = default_error.into();
        if default_error.is_empty() {
            default_error = FALLBACK_ERROR_MESSAGE.to_string();
        }

        Self {
            inner: Arc::new(Inner {
                data: Observable::new(ReceiverSnapshot::not_started()),
                generation: Mutex::new(0),
                default_error,
            }),
        }
    }

    /// Message used for failures without their own
    #[must_use]
    pub fn default_error(&self) -> &str {
        &self.inner.default_error
    }

    /// Observable snapshot for subscription
    #[must_use]
    pub fn data(&self) -> ReadOnlyObservable<ReceiverSnapshot<T>> {
        self.inner.data.read_only()
    }

    /// Observable "busy" flag (`state == Pending`)
    #[must_use]
    pub fn busy(&self) -> Computed<ReceiverSnapshot<T>, bool> {
        self.data().computed(ReceiverSnapshot::is_busy)
    }

    /// Whether an operation is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.data.with(ReceiverSnapshot::is_busy)
    }

    /// Whether [`Receiver::start`] would take effect
    #[must_use]
    pub fn can_start(&self) -> bool {
        !self.is_busy()
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> ReceiverSnapshot<T> {
        self.inner.data.get()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ReceiveState {
        self.inner.data.with(ReceiverSnapshot::state)
    }

    /// Current generation
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.inner.lock_generation()
    }

    /// Receive change notifications
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReceiverSnapshot<T>> {
        self.inner.data.subscribe()
    }

    /// Move to `Pending` without attaching an operation.
    ///
    /// No-op while already pending. Returns a handle to this receiver so a
    /// receiver can be created and started in one expression.
    #[allow(clippy::return_self_not_must_use)]
    pub fn start(&self) -> Self {
        self.begin();
        self.clone()
    }

    /// Move to `Pending` and run the operation produced by `factory`.
    ///
    /// While already pending this is a no-op and `factory` is not called.
    /// Otherwise `factory` is called immediately and its future is spawned on
    /// the current tokio runtime. When the future resolves, its outcome is
    /// applied only if no other `start`, `succeeded`, `failed` or `reset`
    /// happened in between.
    ///
    /// A panic in `factory` or in the future, and an `Err` output, all end in
    /// `Failed` with the error's message (or the default message when empty).
    #[allow(clippy::return_self_not_must_use)]
    pub fn start_with<F, Fut, E>(&self, factory: F) -> Self
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let Some(started_in) = self.begin() else {
            return self.clone();
        };

        let future = match std::panic::catch_unwind(AssertUnwindSafe(factory)) {
            Ok(future) => future,
            Err(payload) => {
                self.inner
                    .settle(started_in, Err(ReceiveError::from_panic(&*payload)));
                return self.clone();
            },
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.inner.settle(
                started_in,
                Err(ReceiveError::OperationFailed(
                    "no tokio runtime available to drive the operation".to_string(),
                )),
            );
            return self.clone();
        };

        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(data)) => Ok(data),
                Ok(Err(error)) => Err(ReceiveError::operation_failed(error)),
                Err(payload) => Err(ReceiveError::from_panic(&*payload)),
            };

            if let Some(inner) = inner.upgrade() {
                inner.settle(started_in, outcome);
            }
        });

        self.clone()
    }

    /// Write `{Received, data}`; outstanding futures are superseded.
    pub fn succeeded(&self, data: T) {
        let mut generation = self.inner.lock_generation();
        self.inner
            .write(&mut generation, ReceiverSnapshot::received(data));
    }

    /// Write `{Failed, message}`; absent or empty messages use the default.
    pub fn failed(&self, message: Option<&str>) {
        let mut generation = self.inner.lock_generation();
        let snapshot = self.inner.failed_snapshot(message);
        self.inner.write(&mut generation, snapshot);
    }

    /// Write `{Unloaded}`, releasing any retained result and superseding
    /// outstanding futures.
    pub fn reset(&self) {
        let mut generation = self.inner.lock_generation();
        self.inner
            .write(&mut generation, ReceiverSnapshot::unloaded());
    }

    /// The result, shared, when `Received`
    #[must_use]
    pub fn shared_result(&self) -> Option<Arc<T>> {
        self.inner.data.with(|snapshot| snapshot.shared_result().cloned())
    }

    /// Wait until the receiver is no longer pending and return that snapshot.
    pub async fn wait_settled(&self) -> ReceiverSnapshot<T> {
        let mut changes = self.subscribe();
        match changes.wait_for(|snapshot| !snapshot.is_busy()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Enter `Pending` unless already there; returns the new generation.
    fn begin(&self) -> Option<u64> {
        let mut generation = self.inner.lock_generation();
        if self.inner.data.with(ReceiverSnapshot::is_busy) {
            tracing::trace!(generation = *generation, "start ignored while pending");
            metrics::counter!(RECEIVER_START_IGNORED).increment(1);
            return None;
        }

        metrics::counter!(RECEIVER_STARTED).increment(1);
        self.inner
            .write(&mut generation, ReceiverSnapshot::pending());
        Some(*generation)
    }
}

/// Typed results of several receivers at once.
///
/// Implemented for tuples of up to six `&Receiver<_>` of any result types.
/// Yields every result only when every receiver is `Received`.
///
/// ```
/// use loadstate_runtime::{Receiver, WhenReceived};
///
/// let name = Receiver::<String>::new("Could not load the name.");
/// let age = Receiver::<u8>::new("Could not load the age.");
/// assert!((&name, &age).when_received().is_none());
///
/// name.succeeded("Ada".to_string());
/// age.succeeded(36);
/// let results = (&name, &age).when_received();
/// assert_eq!(
///     results.map(|(name, age)| (name.to_string(), *age)),
///     Some(("Ada".to_string(), 36))
/// );
/// ```
pub trait WhenReceived {
    /// One shared result per receiver
    type Output;

    /// All results, or `None` while any receiver has none
    fn when_received(&self) -> Option<Self::Output>;
}

macro_rules! impl_when_received {
    ($($receiver:ident: $result:ident),+) => {
        impl<$($result: Send + Sync + 'static),+> WhenReceived for ($(&Receiver<$result>,)+) {
            type Output = ($(Arc<$result>,)+);

            fn when_received(&self) -> Option<Self::Output> {
                let ($($receiver,)+) = *self;
                Some(($($receiver.shared_result()?,)+))
            }
        }
    };
}

impl_when_received!(a: A);
impl_when_received!(a: A, b: B);
impl_when_received!(a: A, b: B, c: C);
impl_when_received!(a: A, b: B, c: C, d: D);
impl_when_received!(a: A, b: B, c: C, d: D, e: E);
impl_when_received!(a: A, b: B, c: C, d: D, e: E, f: F);
