//! Metric names emitted by the runtime.
//!
//! The runtime records through the [`metrics`] facade; without an installed
//! recorder every call is a no-op. Applications that install a recorder can
//! call [`register_metrics`] once to attach descriptions.
//!
//! # Example
//!
//! ```rust
//! loadstate_runtime::metrics::register_metrics();
//! ```

use metrics::describe_counter;

// Re-export metrics macros for use in other modules
pub use metrics::counter;

/// Operations moved to `Pending`
pub const RECEIVER_STARTED: &str = "receiver_started_total";

/// `start` calls ignored because an operation was already pending
pub const RECEIVER_START_IGNORED: &str = "receiver_start_ignored_total";

/// Futures whose outcome was applied, labelled by `outcome`
pub const RECEIVER_SETTLED: &str = "receiver_settled_total";

/// Futures whose outcome was dropped because the receiver moved on
pub const RECEIVER_STALE_SUPPRESSED: &str = "receiver_stale_suppressed_total";

/// Actions processed by a store, labelled by `store`
pub const STORE_ACTIONS_PROCESSED: &str = "store_actions_processed_total";

/// Delayed actions scheduled by a store
pub const STORE_DELAYS_SCHEDULED: &str = "store_delays_scheduled_total";

/// Delayed actions cancelled before firing
pub const STORE_DELAYS_CANCELLED: &str = "store_delays_cancelled_total";

/// Render gate transitions from closed to open
pub const RENDER_GATE_OPENED: &str = "render_gate_opened_total";

/// Register all metric descriptions.
pub fn register_metrics() {
    // Receiver Metrics
    describe_counter!(
        RECEIVER_STARTED,
        "Total number of operations started by receivers"
    );
    describe_counter!(
        RECEIVER_START_IGNORED,
        "Total number of start calls ignored while an operation was pending"
    );
    describe_counter!(
        RECEIVER_SETTLED,
        "Total number of operation outcomes applied to receivers"
    );
    describe_counter!(
        RECEIVER_STALE_SUPPRESSED,
        "Total number of operation outcomes dropped as superseded"
    );

    // Store Metrics
    describe_counter!(
        STORE_ACTIONS_PROCESSED,
        "Total number of actions processed by stores"
    );
    describe_counter!(
        STORE_DELAYS_SCHEDULED,
        "Total number of delayed actions scheduled"
    );
    describe_counter!(
        STORE_DELAYS_CANCELLED,
        "Total number of delayed actions cancelled before firing"
    );

    // Render Gate Metrics
    describe_counter!(
        RENDER_GATE_OPENED,
        "Total number of render gates opened"
    );
}
