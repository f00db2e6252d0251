//! Mock persistence server binary
//!
//! ```text
//! MOCK_SERVER_PORT=8888 cargo run -p namespaced-store-web --bin mock-server
//! ```

use namespaced_store_web::{serve, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "namespaced_store_web=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    serve(listener, AppState::new(), async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Unable to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
