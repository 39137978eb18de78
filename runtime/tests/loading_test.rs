//! Integration tests for multi-receiver tracking
//!
//! Drives real receivers through controllable operations and checks the
//! published view, including the render-threshold timing on paused time.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use loadstate_core::{LoadingBranch, ReceiveState};
use loadstate_runtime::{LoadView, Loading, LoadingConfig, Receiver};
use loadstate_testing::{CallCounter, controlled_operation, init_test_tracing, settle_within};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

const THRESHOLD: Duration = Duration::from_millis(200);

fn gated(receivers: &[&Receiver<u32>]) -> Loading {
    receivers
        .iter()
        .fold(Loading::builder(), |builder, receiver| builder.track(*receiver))
        .with_config(LoadingConfig::new(Some(THRESHOLD)))
        .build()
        .expect("inside a runtime")
}

/// Let spawned tasks observe the latest changes.
async fn settle_tasks() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Render threshold
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_fast_operation_never_renders_pending() {
    init_test_tracing();
    let receiver = Receiver::<u32>::new("Could not load.");
    let loading = gated(&[&receiver]);
    let mut views = loading.subscribe();

    let (control, operation) = controlled_operation();
    receiver.start_with(move || operation);
    assert_eq!(loading.view().branch, LoadingBranch::Hidden);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(loading.view().branch, LoadingBranch::Hidden);

    control.resolve(1);
    settle_within(&receiver, Duration::from_secs(1)).await;
    settle_tasks().await;

    let mut seen: Vec<LoadView> = vec![views.borrow_and_update().clone()];
    tokio::time::sleep(Duration::from_millis(500)).await;
    while views.has_changed().unwrap_or(false) {
        seen.push(views.borrow_and_update().clone());
    }

    assert!(seen.iter().all(|view| view.branch != LoadingBranch::Pending));
    assert_eq!(loading.view().branch, LoadingBranch::Received);
}

#[tokio::test(start_paused = true)]
async fn test_slow_operation_renders_pending_after_threshold() {
    let receiver = Receiver::<u32>::new("Could not load.");
    let loading = gated(&[&receiver]);

    let (control, operation) = controlled_operation();
    receiver.start_with(move || operation);
    assert_eq!(loading.view().branch, LoadingBranch::Hidden);

    tokio::time::sleep(Duration::from_millis(199)).await;
    assert!(!loading.view().gate_open);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(loading.view().branch, LoadingBranch::Pending);

    control.resolve(9);
    settle_within(&receiver, Duration::from_secs(1)).await;
    assert_eq!(loading.view().branch, LoadingBranch::Received);
}

#[tokio::test(start_paused = true)]
async fn test_unloaded_closes_gate_for_next_cycle() {
    let receiver = Receiver::<u32>::new("Could not load.");
    let loading = gated(&[&receiver]);

    receiver.succeeded(1);
    assert!(loading.view().gate_open);

    receiver.reset();
    let view = loading.view();
    assert_eq!(view.branch, LoadingBranch::Unloaded);
    assert!(!view.gate_open);

    receiver.start();
    assert_eq!(loading.view().branch, LoadingBranch::Hidden);
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(loading.view().branch, LoadingBranch::Pending);
}

// ============================================================================
// Aggregation
// ============================================================================

#[tokio::test]
async fn test_failure_dominates_and_collects_messages() {
    let profile = Receiver::<u32>::new("Could not load the profile.");
    let orders = Receiver::<u32>::new("Could not load orders.");
    let settings = Receiver::<u32>::new("Could not load settings.");
    let loading = gated(&[&profile, &orders, &settings]);

    profile.failed(None);
    orders.start();
    settings.failed(Some("Timed out"));

    let view = loading.view();
    assert_eq!(view.dominant, ReceiveState::Failed);
    assert_eq!(view.counts[ReceiveState::Failed], 2);
    assert_eq!(view.counts[ReceiveState::Pending], 1);
    assert_eq!(
        view.branch,
        LoadingBranch::Failed {
            errors: vec![
                "Could not load the profile.".to_string(),
                "Timed out".to_string()
            ]
        }
    );
}

#[tokio::test]
async fn test_received_only_when_every_receiver_received() {
    let first = Receiver::<u32>::new("first");
    let second = Receiver::<String>::new("second");
    let loading = Loading::builder()
        .track(&first)
        .track(&second)
        .build()
        .unwrap();

    first.succeeded(1);
    assert_eq!(loading.view().dominant, ReceiveState::NotStarted);

    second.succeeded("done".to_string());
    assert_eq!(loading.view().dominant, ReceiveState::Received);
    assert_eq!(loading.len(), 2);
}

#[tokio::test]
async fn test_rejected_operation_reaches_failed_branch() {
    let receiver = Receiver::<u32>::new("Could not load.");
    let loading = Loading::builder().track(&receiver).build().unwrap();

    let (control, operation) = controlled_operation();
    receiver.start_with(move || operation);
    assert_eq!(loading.view().branch, LoadingBranch::Pending);

    control.reject("");
    settle_within(&receiver, Duration::from_secs(1)).await;
    assert_eq!(
        loading.view().branch,
        LoadingBranch::Failed {
            errors: vec!["Could not load.".to_string()]
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropped_loading_leaves_receivers_usable() {
    let receiver = Receiver::<u32>::new("Could not load.");
    let loading = gated(&[&receiver]);
    receiver.start();
    drop(loading);

    tokio::time::sleep(Duration::from_millis(500)).await;
    receiver.succeeded(4);
    assert_eq!(receiver.snapshot().result(), Some(&4));
}

// ============================================================================
// Subscribers acting on receivers
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscriber_resetting_failed_receiver_unloads_view() {
    let receiver = Receiver::<u32>::new("Could not load.");
    let loading = Loading::builder().track(&receiver).build().unwrap();

    let writer = receiver.clone();
    let _subscription = receiver.data().subscribe_fn(move |snapshot| {
        if snapshot.state() == ReceiveState::Failed {
            writer.reset();
        }
    });

    receiver.failed(Some("Boom"));

    let mut changes = receiver.subscribe();
    let unloaded = tokio::time::timeout(
        Duration::from_secs(2),
        changes.wait_for(|snapshot| snapshot.state() == ReceiveState::Unloaded),
    )
    .await
    .map(|seen| seen.map(|snapshot| snapshot.state()));
    assert!(matches!(unloaded, Ok(Ok(ReceiveState::Unloaded))));

    let mut views = loading.subscribe();
    let view = tokio::time::timeout(
        Duration::from_secs(2),
        views.wait_for(|view| view.branch == LoadingBranch::Unloaded),
    )
    .await
    .map(|seen| seen.map(|view| view.branch.clone()));
    assert!(matches!(view, Ok(Ok(LoadingBranch::Unloaded))));
    assert_eq!(loading.view().branch, LoadingBranch::Unloaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_view_subscriber_restarting_receivers() {
    let receiver = Receiver::<u32>::new("Could not load.");
    let loading = Loading::builder().track(&receiver).build().unwrap();
    let restarts = CallCounter::new();

    let writer = receiver.clone();
    let counter = restarts.clone();
    let _subscription = loading.observable().subscribe_fn(move |view| {
        if matches!(view.branch, LoadingBranch::Failed { .. }) && writer.can_start() {
            counter.record();
            writer.start();
        }
    });

    receiver.failed(None);

    let mut views = loading.subscribe();
    let pending = tokio::time::timeout(
        Duration::from_secs(2),
        views.wait_for(|view| view.branch == LoadingBranch::Pending),
    )
    .await
    .map(|seen| seen.map(|view| view.dominant));
    assert!(matches!(pending, Ok(Ok(ReceiveState::Pending))));
    assert_eq!(receiver.state(), ReceiveState::Pending);
    assert_eq!(restarts.count(), 1);
}
