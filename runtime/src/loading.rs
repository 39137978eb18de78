//! Aggregate several receivers into one observable view.
//!
//! A [`Loading`] tracks any number of receivers (of any result types),
//! computes their dominant state, feeds it to its own [`RenderThreshold`] and
//! publishes a [`LoadView`] that a presentation layer can switch on.
//!
//! A background task recomputes the view whenever a tracked receiver changes
//! or the gate's timer fires. [`Loading::view`] also recomputes on demand, so a
//! read right after a receiver write is never stale. Dropping the `Loading`
//! stops the task and clears the gate's timer.

use crate::config::LoadingConfig;
use crate::error::StoreError;
use crate::observable::{Observable, ReadOnlyObservable};
use crate::receiver::Receiver;
use crate::threshold::RenderThreshold;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use loadstate_core::{
    AggregateCounts, DefaultPolicy, DeterminePolicy, LoadingBranch, ReceiveState, SnapshotSummary,
    counts_by_state, select_branch,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Something whose state can be aggregated and watched for changes.
pub trait Trackable: Send + Sync + 'static {
    /// Current state and error message
    fn summary(&self) -> SnapshotSummary;

    /// Stream yielding once per change; ends when the source is gone
    fn changes(&self) -> BoxStream<'static, ()>;
}

impl<T: Send + Sync + 'static> Trackable for Receiver<T> {
    fn summary(&self) -> SnapshotSummary {
        self.data().with(|snapshot| snapshot.summary())
    }

    fn changes(&self) -> BoxStream<'static, ()> {
        stream::unfold(self.subscribe(), |mut changes| async move {
            changes.changed().await.ok()?;
            Some(((), changes))
        })
        .boxed()
    }
}

/// Everything a presentation layer needs to pick a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadView {
    /// Aggregate state of all tracked receivers
    pub dominant: ReceiveState,
    /// Receivers per state
    pub counts: AggregateCounts,
    /// Whether transient states may render
    pub gate_open: bool,
    /// Branch to render
    pub branch: LoadingBranch,
}

type SharedPolicy = Arc<dyn DeterminePolicy<SnapshotSummary> + Send + Sync>;

/// Builder for [`Loading`]
#[derive(Default)]
pub struct LoadingBuilder {
    sources: Vec<Arc<dyn Trackable>>,
    config: LoadingConfig,
    policy: Option<SharedPolicy>,
}

impl fmt::Debug for LoadingBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingBuilder")
            .field("sources", &self.sources.len())
            .field("config", &self.config)
            .field("custom_policy", &self.policy.is_some())
            .finish()
    }
}

impl LoadingBuilder {
    /// Track a receiver
    #[must_use]
    pub fn track<T: Send + Sync + 'static>(self, receiver: &Receiver<T>) -> Self {
        self.track_source(receiver.clone())
    }

    /// Track any [`Trackable`] source
    #[must_use]
    pub fn track_source(mut self, source: impl Trackable) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Set the configuration
    #[must_use]
    pub const fn with_config(mut self, config: LoadingConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default dominant-state policy
    #[must_use]
    pub fn with_policy(
        mut self,
        policy: impl DeterminePolicy<SnapshotSummary> + Send + Sync + 'static,
    ) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// Compute the initial view and start watching the sources.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when called outside a tokio runtime.
    pub fn build(self) -> Result<Loading, StoreError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let tracker = Arc::new(Tracker {
            sources: self.sources,
            policy: self.policy.unwrap_or_else(|| Arc::new(DefaultPolicy)),
            threshold: RenderThreshold::from_config(&self.config),
        });
        let view = Observable::new(tracker.refresh());

        let task = runtime.spawn(watch_sources(Arc::clone(&tracker), view.clone()));

        Ok(Loading {
            tracker,
            view,
            task,
        })
    }
}

struct Tracker {
    sources: Vec<Arc<dyn Trackable>>,
    policy: SharedPolicy,
    threshold: RenderThreshold,
}

impl Tracker {
    /// Recompute the dominant state, feed the gate, and build the view.
    fn refresh(&self) -> LoadView {
        let summaries: Vec<SnapshotSummary> =
            self.sources.iter().map(|source| source.summary()).collect();
        let dominant = self.policy.determine(&summaries);

        if let Err(error) = self.threshold.observe(dominant) {
            tracing::debug!(error = %error, "render gate did not accept dominant state");
        }

        let gate_open = self.threshold.is_open();
        LoadView {
            dominant,
            counts: counts_by_state(&summaries),
            gate_open,
            branch: select_branch(dominant, gate_open, &summaries),
        }
    }
}

async fn watch_sources(tracker: Arc<Tracker>, view: Observable<LoadView>) {
    let mut changes = stream::select_all(tracker.sources.iter().map(|source| source.changes()));
    let mut gate = tracker.threshold.subscribe();

    loop {
        tokio::select! {
            Some(()) = changes.next() => {},
            Ok(()) = gate.changed() => {},
            else => break,
        }

        if view.set_if_changed(tracker.refresh()) {
            view.with(|current| {
                tracing::debug!(
                    dominant = %current.dominant,
                    gate_open = current.gate_open,
                    "loading view changed"
                );
            });
        }
    }
}

/// Multi-receiver view with render-threshold gating.
///
/// # Example
///
/// ```no_run
/// use loadstate_runtime::{Loading, LoadingConfig, Receiver};
/// use loadstate_core::{LoadingBranch, ReceiveState};
///
/// # async fn example() -> Result<(), loadstate_runtime::StoreError> {
/// let user: Receiver<String> = Receiver::new("Could not load the user.");
/// let orders: Receiver<Vec<u32>> = Receiver::new("Could not load orders.");
///
/// let loading = Loading::builder()
///     .track(&user)
///     .track(&orders)
///     .with_config(LoadingConfig::from_millis(200))
///     .build()?;
///
/// user.start();
/// assert_eq!(loading.view().dominant, ReceiveState::Pending);
/// assert_eq!(loading.view().branch, LoadingBranch::Hidden);
/// # Ok(())
/// # }
/// ```
pub struct Loading {
    tracker: Arc<Tracker>,
    view: Observable<LoadView>,
    task: JoinHandle<()>,
}

impl fmt::Debug for Loading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loading")
            .field("sources", &self.tracker.sources.len())
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl Loading {
    /// Start building a view
    #[must_use]
    pub fn builder() -> LoadingBuilder {
        LoadingBuilder::default()
    }

    /// Current view, recomputed from the sources
    #[must_use]
    pub fn view(&self) -> LoadView {
        let view = self.tracker.refresh();
        self.view.set_if_changed(view.clone());
        view
    }

    /// Observable view, updated by the background task
    #[must_use]
    pub fn observable(&self) -> ReadOnlyObservable<LoadView> {
        self.view.read_only()
    }

    /// Receive a notification whenever the view changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadView> {
        self.view.subscribe()
    }

    /// Number of tracked sources
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracker.sources.len()
    }

    /// Whether no source is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracker.sources.is_empty()
    }
}

impl Drop for Loading {
    fn drop(&mut self) {
        self.task.abort();
        self.tracker.threshold.shutdown();
    }
}
