//! Records every action a store broadcasts

use namespaced_store_core::Action;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;

/// Collects actions from a store's action stream in broadcast order
///
/// Recording stops when the recorder is dropped or the stream closes.
#[derive(Debug)]
pub struct ActionRecorder {
    actions: Arc<Mutex<Vec<Action>>>,
    notify: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ActionRecorder {
    /// Start recording from `receiver`
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(mut receiver: broadcast::Receiver<Action>) -> Self {
        let actions = Arc::new(Mutex::new(Vec::new()));
        let notify = Arc::new(Notify::new());

        let task = tokio::spawn({
            let actions = Arc::clone(&actions);
            let notify = Arc::clone(&notify);
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(action) => {
                            actions.lock().unwrap_or_else(PoisonError::into_inner).push(action);
                            notify.notify_waiters();
                        },
                        Err(broadcast::error::RecvError::Lagged(_)) => {},
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Self {
            actions,
            notify,
            task,
        }
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded composed types, in order
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|a| a.action_type.clone())
            .collect()
    }

    /// How many actions of `action_type` were recorded
    #[must_use]
    pub fn count(&self, action_type: &str) -> usize {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }

    /// Wait until an action of `action_type` has been recorded
    ///
    /// Returns the first such action, or `None` on timeout.
    pub async fn wait_for(&self, action_type: &str, timeout: Duration) -> Option<Action> {
        let find = || {
            self.actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|a| a.action_type == action_type)
                .cloned()
        };

        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if let Some(action) = find() {
                    return action;
                }
                notified.await;
            }
        })
        .await
        .ok()
    }
}

impl Drop for ActionRecorder {
    fn drop(&mut self) {
        self.task.abort();
    }
}
