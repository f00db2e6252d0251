//! Counter demo binary
//!
//! Plays a scripted session against the store: a few counter clicks, then
//! three rapid "run" presses of which only the last one reports a cost.

use counter::{CounterApp, SIMULATED_LATENCY};
use namespaced_store_core::environment::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=debug,namespaced_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    namespaced_store_runtime::metrics::register_metrics();

    println!("=== Counter Demo ===\n");

    let app = CounterApp::start(Arc::new(SystemClock))?;
    println!("Initial state: {:?}", app.snapshot().await);

    for _ in 0..3 {
        app.increment().await?;
    }
    println!("After 3 x increment: {}", app.snapshot().await.counter);

    app.decrement().await?;
    println!("After decrement: {}", app.snapshot().await.counter);

    println!("\n>>> Pressing run three times in quick succession");
    for _ in 0..3 {
        app.run().await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    tokio::time::sleep(SIMULATED_LATENCY + Duration::from_millis(200)).await;
    println!("Cost reported: {:.1} ms", app.snapshot().await.cost);

    app.shutdown(Duration::from_secs(5)).await?;
    println!("\n=== Done ===");

    Ok(())
}
