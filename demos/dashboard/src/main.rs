//! Dashboard demo binary
//!
//! Loads three panels with different latencies behind one render threshold and
//! prints every view the presentation layer would render.

use loadstate_core::ReceiveState;
use loadstate_runtime::{Loading, LoadingConfig, Receiver, StoreError, metrics};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_THRESHOLD_MS: u64 = 200;

async fn simulated<T>(latency_ms: u64, outcome: Result<T, &'static str>) -> Result<T, &'static str> {
    tokio::time::sleep(Duration::from_millis(latency_ms)).await;
    outcome
}

fn config() -> LoadingConfig {
    match LoadingConfig::from_env() {
        Ok(config) if config.minimum_render_threshold.is_some() => config,
        Ok(_) => LoadingConfig::from_millis(DEFAULT_THRESHOLD_MS),
        Err(error) => {
            tracing::warn!(error = %error, "Falling back to the default render threshold");
            LoadingConfig::from_millis(DEFAULT_THRESHOLD_MS)
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), StoreError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard=debug,loadstate_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    metrics::register_metrics();

    println!("=== Dashboard Example: three panels, one loading view ===\n");

    let profile = Receiver::<String>::new("Could not load the profile.");
    let orders = Receiver::<Vec<u32>>::new("Could not load orders.");
    let settings = Receiver::<bool>::new("Could not load settings.");

    let config = config();
    println!("Render threshold: {:?}\n", config.minimum_render_threshold);

    let loading = Loading::builder()
        .track(&profile)
        .track(&orders)
        .track(&settings)
        .with_config(config)
        .build()?;
    let mut views = loading.subscribe();

    // Fast panels settle before the threshold; nothing is shown for them
    println!(">>> Loading profile and settings (fast)");
    profile.start_with(|| simulated(50, Ok("Ada".to_string())));
    settings.start_with(|| simulated(80, Ok(true)));
    tokio::time::sleep(Duration::from_millis(150)).await;
    println!("Branch after 150ms: {:?}", loading.view().branch);

    // A slow panel passes the threshold; the pending branch appears
    println!("\n>>> Loading orders (slow)");
    orders.start_with(|| simulated(600, Ok(vec![1, 2, 3])));

    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        println!(
            "View: {}",
            serde_json::to_string(&view).unwrap_or_else(|_| format!("{view:?}"))
        );
        if view.dominant == ReceiveState::Received {
            break;
        }
    }

    // A failed reload dominates
    println!("\n>>> Reloading settings (fails)");
    settings.start_with(|| simulated(100, Err("Settings service unavailable")));
    settings.wait_settled().await;
    println!("Branch: {:?}", loading.view().branch);

    // Releasing everything closes the gate for the next cycle
    println!("\n>>> Resetting all panels");
    profile.reset();
    orders.reset();
    settings.reset();
    let view = loading.view();
    println!("Branch: {:?} (gate open: {})", view.branch, view.gate_open);

    println!("\n=== Example Complete ===");
    Ok(())
}
