//! Shared in-memory list

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across all handlers
///
/// Clones share the same list. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    list: Arc<RwLock<Vec<Value>>>,
}

impl AppState {
    /// Start with an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the list
    pub async fn list(&self) -> Vec<Value> {
        self.list.read().await.clone()
    }

    /// Replace the list wholesale
    pub async fn replace(&self, list: Vec<Value>) {
        *self.list.write().await = list;
    }
}
