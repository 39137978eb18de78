//! Observable cells backed by [`tokio::sync::watch`].
//!
//! Writes are synchronous: a value written with [`Observable::set`] is visible
//! to every reader before `set` returns. Subscribers are notified through the
//! watch channel, so a slow subscriber sees the latest value rather than every
//! intermediate one.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A mutable cell that notifies subscribers on every write.
///
/// Cloning an `Observable` shares the cell.
pub struct Observable<T> {
    sender: Arc<watch::Sender<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.sender.borrow())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Observable<T> {
    /// Create a cell holding `initial`
    #[must_use]
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Read the current value through a closure, without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Clone of the current value
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.sender.borrow().clone()
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Replace the value and return the previous one
    pub fn replace(&self, value: T) -> T {
        self.sender.send_replace(value)
    }

    /// Replace the value only when it differs, notifying only then.
    ///
    /// Returns `true` if the value changed.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Receive change notifications. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Read-only view of the same cell
    #[must_use]
    pub fn read_only(&self) -> ReadOnlyObservable<T> {
        ReadOnlyObservable {
            sender: Arc::clone(&self.sender),
        }
    }
}

/// Read-only view of an [`Observable`].
pub struct ReadOnlyObservable<T> {
    sender: Arc<watch::Sender<T>>,
}

impl<T> Clone for ReadOnlyObservable<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnlyObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnlyObservable")
            .field(&*self.sender.borrow())
            .finish()
    }
}

impl<T> ReadOnlyObservable<T> {
    /// Read the current value through a closure
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Clone of the current value
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.sender.borrow().clone()
    }

    /// Receive change notifications. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Derived cell recomputed from this one on every read
    pub fn computed<U, F>(&self, project: F) -> Computed<T, U>
    where
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Computed {
            source: self.clone(),
            project: Arc::new(project),
        }
    }

    /// Invoke `callback` with the latest value after every change.
    ///
    /// The callback runs on a spawned tokio task with a copy of the value, so
    /// it may write back to this cell. Dropping the returned [`Subscription`]
    /// (or calling [`Subscription::unsubscribe`]) stops it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn subscribe_fn<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
        T: Clone + Send + Sync + 'static,
    {
        let mut receiver = self.sender.subscribe();
        let task = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let value = receiver.borrow_and_update().clone();
                callback(&value);
            }
        });
        Subscription { task }
    }
}

impl<T> From<&Observable<T>> for ReadOnlyObservable<T> {
    fn from(observable: &Observable<T>) -> Self {
        observable.read_only()
    }
}

type Projection<T, U> = Arc<dyn Fn(&T) -> U + Send + Sync>;

/// A read-only value derived from another cell.
///
/// Nothing is cached; every [`Computed::get`] applies the projection to the
/// source's current value.
pub struct Computed<T, U> {
    source: ReadOnlyObservable<T>,
    project: Projection<T, U>,
}

impl<T, U> Clone for Computed<T, U> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            project: Arc::clone(&self.project),
        }
    }
}

impl<T, U: fmt::Debug> fmt::Debug for Computed<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Computed").field(&self.get()).finish()
    }
}

impl<T, U> Computed<T, U> {
    /// Current derived value
    #[must_use]
    pub fn get(&self) -> U {
        self.source.with(|value| (self.project)(value))
    }

    /// Invoke `callback` whenever the derived value changes.
    ///
    /// The projection runs while the source is borrowed; the callback runs
    /// after the borrow is released and may write to the source.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn subscribe_fn<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(U) + Send + 'static,
        T: Send + Sync + 'static,
        U: Clone + PartialEq + Send + 'static,
    {
        let project = Arc::clone(&self.project);
        let mut receiver = self.source.subscribe();
        let mut last = self.get();
        let task = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let next = project(&receiver.borrow_and_update());
                if next != last {
                    last = next.clone();
                    callback(next);
                }
            }
        });
        Subscription { task }
    }
}

/// Handle returned by `subscribe_fn`; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop receiving notifications
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
