//! # Loadstate Runtime
//!
//! Runtime pieces for tracking asynchronous operations on tokio.
//!
//! ## Core Components
//!
//! - **Observable**: Mutable cell that notifies subscribers on every write
//! - **Receiver**: Lifecycle of one asynchronous operation, with stale-result suppression
//! - **Store**: Executes a reducer and its timer effects
//! - **`RenderThreshold`**: Debounce gate deciding when a loading state may be shown
//! - **Loading**: Aggregates several receivers into one observable view
//!
//! ## Example
//!
//! ```no_run
//! use loadstate_runtime::{Loading, LoadingConfig, Receiver};
//! use loadstate_core::LoadingBranch;
//!
//! # async fn example() -> Result<(), loadstate_runtime::StoreError> {
//! let profile: Receiver<String> = Receiver::new("Could not load the profile.");
//! profile.start_with(|| async { Ok::<_, std::io::Error>("Ada".to_string()) });
//!
//! let loading = Loading::builder()
//!     .track(&profile)
//!     .with_config(LoadingConfig::from_millis(200))
//!     .build()?;
//!
//! if loading.view().branch == LoadingBranch::Received {
//!     println!("{:?}", profile.snapshot().result());
//! }
//! # Ok(())
//! # }
//! ```

/// Configuration for multi-receiver tracking
pub mod config;

/// Aggregation of several receivers into one view
pub mod loading;

/// Metric names and descriptions
pub mod metrics;

/// Observable cells
pub mod observable;

/// Lifecycle of one asynchronous operation
pub mod receiver;

/// Render-threshold controller
pub mod threshold;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// A delayed effect needs a tokio runtime and none is running
        ///
        /// The action itself was applied; only its timer was dropped.
        #[error("No tokio runtime available to run a delayed effect")]
        NoRuntime,
    }
}

/// Store module - The runtime for reducers
pub mod store;

pub use config::{ConfigError, LoadingConfig};
pub use error::StoreError;
pub use loading::{LoadView, Loading, LoadingBuilder, Trackable};
pub use observable::{Computed, Observable, ReadOnlyObservable, Subscription};
pub use receiver::{Receiver, WhenReceived};
pub use store::Store;
pub use threshold::RenderThreshold;
