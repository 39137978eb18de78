//! # Loadstate Testing
//!
//! Testing utilities for receivers, aggregation and the render gate.
//!
//! This crate provides:
//! - A Given-When-Then harness for reducers
//! - Operations whose outcome the test decides
//! - Snapshot assertions and tracing setup
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use loadstate_core::ReceiveState;
//! use loadstate_runtime::Receiver;
//! use loadstate_testing::controlled_operation;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (control, operation) = controlled_operation::<u32>();
//! let receiver = Receiver::new("Could not load.").start_with(move || operation);
//! assert_eq!(receiver.state(), ReceiveState::Pending);
//!
//! control.resolve(7);
//! let snapshot = receiver.wait_settled().await;
//! assert_eq!(snapshot.result(), Some(&7));
//! # }
//! ```

/// Ergonomic reducer testing with Given-When-Then syntax
pub mod reducer_test;

/// Operations driven from the test body.
pub mod mocks {
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Message an abandoned [`controlled_operation`] fails with
    pub const ABANDONED: &str = "operation abandoned";

    /// Decides the outcome of the future returned by [`controlled_operation`].
    ///
    /// Dropping the control without deciding fails the operation with
    /// [`ABANDONED`].
    #[derive(Debug)]
    pub struct OperationControl<T> {
        sender: oneshot::Sender<Result<T, String>>,
    }

    impl<T> OperationControl<T> {
        /// Resolve the operation; `false` if nobody awaits it anymore
        pub fn resolve(self, value: T) -> bool {
            self.sender.send(Ok(value)).is_ok()
        }

        /// Reject the operation with `message`; `false` if nobody awaits it anymore
        pub fn reject(self, message: impl Into<String>) -> bool {
            self.sender.send(Err(message.into())).is_ok()
        }
    }

    /// A pending operation and the handle that settles it.
    #[must_use]
    pub fn controlled_operation<T: Send + 'static>()
    -> (OperationControl<T>, BoxFuture<'static, Result<T, String>>) {
        let (sender, receiver) = oneshot::channel();
        let operation = async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(ABANDONED.to_string()))
        }
        .boxed();
        (OperationControl { sender }, operation)
    }

    /// Counts how many times a factory was invoked.
    #[derive(Debug, Clone, Default)]
    pub struct CallCounter {
        calls: Arc<AtomicUsize>,
    }

    impl CallCounter {
        /// A counter at zero
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Record one call
        pub fn record(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        /// Calls recorded so far
        #[must_use]
        pub fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use loadstate_core::{ReceiveState, ReceiverSnapshot};
    use loadstate_runtime::Receiver;
    use std::time::Duration;

    /// Install a test-writer subscriber honouring `RUST_LOG`; repeat calls are no-ops.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Assert the invariants every published snapshot holds.
    ///
    /// A result is present exactly when `Received`, and the error message is
    /// non-empty exactly when `Failed`.
    ///
    /// # Panics
    ///
    /// Panics if an invariant does not hold.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_snapshot_invariants<T: std::fmt::Debug>(snapshot: &ReceiverSnapshot<T>) {
        assert_eq!(
            snapshot.result().is_some(),
            snapshot.state() == ReceiveState::Received,
            "result presence disagrees with state: {snapshot:?}"
        );
        assert_eq!(
            !snapshot.error_message().is_empty(),
            snapshot.state() == ReceiveState::Failed,
            "error message disagrees with state: {snapshot:?}"
        );
    }

    /// Wait for a receiver to settle, giving up after `limit`.
    ///
    /// # Panics
    ///
    /// Panics if the receiver is still pending after `limit`.
    #[allow(clippy::panic)] // Test assertion
    pub async fn settle_within<T>(receiver: &Receiver<T>, limit: Duration) -> ReceiverSnapshot<T>
    where
        T: Send + Sync + 'static,
    {
        match tokio::time::timeout(limit, receiver.wait_settled()).await {
            Ok(snapshot) => snapshot,
            Err(_) => panic!("receiver still pending after {limit:?}"),
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use loadstate_core::{ReceiveState, ReceiverSnapshot, SnapshotSummary};
    use proptest::prelude::*;

    /// Any receive state
    pub fn arb_receive_state() -> impl Strategy<Value = ReceiveState> {
        prop::sample::select(ReceiveState::ALL.to_vec())
    }

    /// A well-formed snapshot carrying a `u32` result
    pub fn arb_snapshot() -> impl Strategy<Value = ReceiverSnapshot<u32>> {
        prop_oneof![
            Just(ReceiverSnapshot::not_started()),
            Just(ReceiverSnapshot::pending()),
            Just(ReceiverSnapshot::unloaded()),
            any::<u32>().prop_map(ReceiverSnapshot::received),
            "[a-z ]{1,16}".prop_map(ReceiverSnapshot::failed),
        ]
    }

    /// Up to `max` summaries
    pub fn arb_summaries(max: usize) -> impl Strategy<Value = Vec<SnapshotSummary>> {
        prop::collection::vec(
            arb_snapshot().prop_map(|snapshot| snapshot.summary()),
            0..=max,
        )
    }

    /// One step applied to a receiver by a caller
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ReceiverStep {
        /// `start()`
        Start,
        /// `succeeded(value)`
        Succeed(u32),
        /// `failed(message)`
        Fail(Option<String>),
        /// `reset()`
        Reset,
    }

    /// Any receiver step, including empty failure messages
    pub fn arb_receiver_step() -> impl Strategy<Value = ReceiverStep> {
        prop_oneof![
            Just(ReceiverStep::Start),
            any::<u32>().prop_map(ReceiverStep::Succeed),
            prop::option::of("[a-z]{0,8}").prop_map(ReceiverStep::Fail),
            Just(ReceiverStep::Reset),
        ]
    }
}

pub use helpers::{assert_snapshot_invariants, init_test_tracing, settle_within};
pub use mocks::{CallCounter, OperationControl, controlled_operation};
pub use reducer_test::{ReducerTest, assertions};
