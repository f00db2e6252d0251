//! Todo demo binary
//!
//! Needs the mock server:
//!
//! ```text
//! cargo run -p namespaced-store-web --bin mock-server &
//! cargo run -p todo
//! ```
//!
//! `TODO_SERVER_URL` points it elsewhere.

use namespaced_store_runtime::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use todo::{HttpTodoApi, TodoApp, TodoListState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Poll until no fetch is pending and no effect is running
async fn settle(app: &TodoApp) -> TodoListState {
    loop {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let state = app.snapshot().await;
        if !state.loading && app.store().in_flight() == 0 {
            return state;
        }
    }
}

fn print_list(title: &str, state: &TodoListState) {
    println!("{title}");
    if let Some(error) = &state.error {
        println!("  (error: {error})");
    }
    for item in &state.items {
        println!("  [{}] #{} {}", if item.done { "x" } else { " " }, item.id, item.content);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo=debug,namespaced_store_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    namespaced_store_runtime::metrics::register_metrics();

    let api = HttpTodoApi::from_env();
    println!("=== Todo Demo against {} ===\n", api.base_url());

    let app = TodoApp::start(Arc::new(api), RetryPolicy::default())?;

    app.fetch().await?;
    print_list("Loaded:", &settle(&app).await);

    app.add("write the demo").await?;
    app.add("run the demo").await?;
    let first = app.snapshot().await.items.first().map(|i| i.id);
    if let Some(id) = first {
        app.toggle(id).await?;
    }
    print_list("\nEdited:", &app.snapshot().await);

    app.save().await?;
    settle(&app).await;

    app.fetch().await?;
    print_list("\nReloaded from server:", &settle(&app).await);

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
