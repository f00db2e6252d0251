//! Persistence for the todo list
//!
//! Effects reach the backend only through [`TodoApi`], injected when the
//! async binding is built. [`HttpTodoApi`] talks to the mock server;
//! [`InMemoryTodoApi`] stands in for it in tests and offline runs.

use crate::TodoItem;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Server the HTTP client talks to when `TODO_SERVER_URL` is unset
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8888";

/// Errors talking to the todo backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure or non-success status
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered but reported `success: false`
    #[error("Server rejected the request")]
    Rejected,

    /// The backend is temporarily unavailable
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    /// Whether retrying may help
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(error) => {
                error.is_connect()
                    || error.is_timeout()
                    || error.status().is_some_and(|s| s.is_server_error())
            },
            Self::Rejected => false,
            Self::Unavailable(_) => true,
        }
    }
}

/// Todo persistence
pub trait TodoApi: Send + Sync {
    /// Load the stored list
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the backend cannot be reached or rejects the request.
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Vec<TodoItem>, ApiError>> + Send + '_>>;

    /// Replace the stored list
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the backend cannot be reached or rejects the request.
    fn save<'a>(
        &'a self,
        items: &'a [TodoItem],
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    success: bool,
    #[serde(default)]
    data: Vec<TodoItem>,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    success: bool,
}

/// [`TodoApi`] over HTTP, against the mock server's protocol
#[derive(Debug, Clone)]
pub struct HttpTodoApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTodoApi {
    /// Talk to the server at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Talk to `TODO_SERVER_URL`, or the local mock server
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("TODO_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string()))
    }

    /// The server URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TodoApi for HttpTodoApi {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Vec<TodoItem>, ApiError>> + Send + '_>> {
        Box::pin(async move {
            let response: ListResponse = self
                .client
                .get(&self.base_url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if !response.success {
                return Err(ApiError::Rejected);
            }

            tracing::debug!(items = response.data.len(), "Fetched todos");
            Ok(response.data)
        })
    }

    fn save<'a>(
        &'a self,
        items: &'a [TodoItem],
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let response: SaveResponse = self
                .client
                .post(&self.base_url)
                .json(items)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if !response.success {
                return Err(ApiError::Rejected);
            }

            tracing::debug!(items = items.len(), "Saved todos");
            Ok(())
        })
    }
}

/// [`TodoApi`] backed by a vector, with optional latency and failures
#[derive(Debug, Default)]
pub struct InMemoryTodoApi {
    items: Mutex<Vec<TodoItem>>,
    latency: Duration,
    failures_left: AtomicU32,
    fetches: AtomicU32,
    saves: AtomicU32,
}

impl InMemoryTodoApi {
    /// Start with `items`
    #[must_use]
    pub fn new(items: Vec<TodoItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    /// Delay every call by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next `count` calls with [`ApiError::Unavailable`]
    #[must_use]
    pub fn with_failures(self, count: u32) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Snapshot of the stored list
    #[must_use]
    pub fn items(&self) -> Vec<TodoItem> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Fetch calls so far, including failed ones
    #[must_use]
    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Save calls so far, including failed ones
    #[must_use]
    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    async fn call(&self) -> Result<(), ApiError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ApiError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl TodoApi for InMemoryTodoApi {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Vec<TodoItem>, ApiError>> + Send + '_>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.call().await?;
            Ok(self.items())
        })
    }

    fn save<'a>(
        &'a self,
        items: &'a [TodoItem],
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.call().await?;
            *self.items.lock().unwrap_or_else(PoisonError::into_inner) = items.to_vec();
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: u64) -> TodoItem {
        TodoItem {
            id,
            content: format!("item {id}"),
            done: false,
        }
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let api = InMemoryTodoApi::default();

        api.save(&[item(1), item(2)]).await.unwrap();

        assert_eq!(api.fetch().await.unwrap(), vec![item(1), item(2)]);
        assert_eq!((api.fetches(), api.saves()), (1, 1));
    }

    #[tokio::test]
    async fn test_in_memory_failures_are_transient() {
        let api = InMemoryTodoApi::new(vec![item(1)]).with_failures(1);

        let error = api.fetch().await.unwrap_err();
        assert!(error.is_transient());
        assert_eq!(api.fetch().await.unwrap(), vec![item(1)]);
    }

    #[test]
    fn test_rejected_is_not_transient() {
        assert!(!ApiError::Rejected.is_transient());
    }
}
