//! In-memory mock persistence server.
//!
//! Stands in for a real backend while developing the todo demo. It keeps a
//! single JSON list in memory:
//!
//! - `GET` on any path returns `{"success": true, "data": [...]}`
//! - `POST` on any path replaces the list with the body (a JSON array) and
//!   returns `{"success": true}`
//! - `OPTIONS` and every other method return an empty `200`
//!
//! CORS is wide open, so a browser client on any origin can talk to it.
//!
//! # Example
//!
//! ```ignore
//! use namespaced_store_web::{router, AppState, ServerConfig};
//!
//! let config = ServerConfig::from_env();
//! let listener = tokio::net::TcpListener::bind(config.addr()).await?;
//! axum::serve(listener, router(AppState::new())).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;

/// Preflight cache lifetime
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// CORS policy: any origin, the usual verbs, a day of preflight caching
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-http-method-override"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .max_age(CORS_MAX_AGE)
}

/// Build the router serving every path
pub fn router(state: AppState) -> Router {
    let methods = get(handlers::read_list)
        .post(handlers::replace_list)
        .options(handlers::empty)
        .fallback(handlers::empty);

    Router::new()
        .route("/", methods.clone())
        .route("/*path", methods)
        .with_state(state)
        .layer(cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Serve `state` on `listener` until `shutdown` resolves
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve<F>(listener: tokio::net::TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Mock server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
