//! Watch modes and the per-effect watcher loop.
//!
//! A watcher receives every action of one composed type, in dispatch order,
//! and starts effect runs according to its [`WatchMode`]. Every run is a tokio
//! task owned by the watcher's `JoinSet`, so stopping the watcher aborts all
//! of its runs.

use crate::async_binding::{EffectContext, EffectHandler};
use crate::metrics::EffectMetrics;
use crate::store::Dispatcher;
use namespaced_store_core::{Action, ActionType};
use std::fmt;
use std::str::FromStr;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinSet};

/// How concurrent triggering actions map to handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WatchMode {
    /// Every matching action starts an independent run
    #[default]
    All,

    /// A new matching action cancels the active run, then replaces it
    LatestOnly,

    /// Matching actions are ignored while a run is active
    LeadingOnly,
}

impl WatchMode {
    /// Canonical name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "watchAll",
            Self::LatestOnly => "watchLatestOnly",
            Self::LeadingOnly => "watchLeadingOnly",
        }
    }
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized mode name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown watch mode `{0}`")]
pub struct UnknownWatchMode(pub String);

impl FromStr for WatchMode {
    type Err = UnknownWatchMode;

    /// Accepts the canonical names and the `take*` aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watchAll" | "takeEvery" => Ok(Self::All),
            "watchLatestOnly" | "takeLatest" => Ok(Self::LatestOnly),
            "watchLeadingOnly" | "takeLeading" => Ok(Self::LeadingOnly),
            other => Err(UnknownWatchMode(other.to_string())),
        }
    }
}

/// A run started by a watcher, with its cancel signal
struct ActiveRun {
    abort: AbortHandle,
    cancel: watch::Sender<bool>,
}

impl ActiveRun {
    fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    /// Signal cooperative cancellation, then abort at the next suspension point
    fn cancel(&self) {
        let _ = self.cancel.send(true);
        self.abort.abort();
    }
}

/// Receives the actions of one composed type
pub(crate) struct Watcher {
    pub(crate) action_type: ActionType,
    pub(crate) mode: WatchMode,
    pub(crate) handler: EffectHandler,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) actions: mpsc::UnboundedReceiver<Action>,
}

impl Watcher {
    /// Run until the store closes the delivery channel
    pub(crate) async fn run(mut self) {
        let type_string = self.action_type.to_string();
        let mut runs: JoinSet<()> = JoinSet::new();
        let mut active: Option<ActiveRun> = None;

        tracing::debug!(action_type = %type_string, mode = %self.mode, "Watcher started");

        loop {
            tokio::select! {
                received = self.actions.recv() => match received {
                    Some(action) => self.on_match(action, &mut runs, &mut active),
                    None => break,
                },
                Some(finished) = runs.join_next(), if !runs.is_empty() => {
                    if let Err(error) = finished {
                        if error.is_panic() {
                            tracing::error!(action_type = %type_string, "Effect run panicked");
                            EffectMetrics::record_failure(&type_string);
                        }
                    }
                },
            }
        }

        tracing::debug!(action_type = %type_string, "Watcher stopped");
    }

    fn on_match(&self, action: Action, runs: &mut JoinSet<()>, active: &mut Option<ActiveRun>) {
        match self.mode {
            WatchMode::All => {
                self.spawn_run(action, runs);
            },
            WatchMode::LatestOnly => {
                let previous = active.take();
                *active = Some(self.spawn_run(action, runs));

                if let Some(previous) = previous.filter(|run| !run.is_finished()) {
                    tracing::debug!(action_type = %self.action_type, "Cancelling previous run");
                    EffectMetrics::record_cancelled(&self.action_type.to_string());
                    previous.cancel();
                }
            },
            WatchMode::LeadingOnly => {
                if active.as_ref().is_some_and(|run| !run.is_finished()) {
                    tracing::trace!(action_type = %self.action_type, "Run active, ignoring action");
                    EffectMetrics::record_ignored(&self.action_type.to_string());
                    return;
                }
                *active = Some(self.spawn_run(action, runs));
            },
        }
    }

    fn spawn_run(&self, action: Action, runs: &mut JoinSet<()>) -> ActiveRun {
        let (cancel, cancelled) = watch::channel(false);
        let context = EffectContext::new(
            self.dispatcher.clone(),
            self.action_type.clone(),
            cancelled,
        );
        let guard = self.dispatcher.track_run();
        let handler = std::sync::Arc::clone(&self.handler);
        let type_string = action.action_type.clone();

        EffectMetrics::record_started(&type_string, self.mode.as_str());

        let abort = runs.spawn(async move {
            let _guard = guard;
            if let Err(error) = handler(action, context).await {
                tracing::warn!(action_type = %type_string, error = %error, "Effect run failed");
                EffectMetrics::record_failure(&type_string);
            }
        });

        ActiveRun { abort, cancel }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names_and_aliases() {
        assert_eq!("watchAll".parse(), Ok(WatchMode::All));
        assert_eq!("takeEvery".parse(), Ok(WatchMode::All));
        assert_eq!("takeLatest".parse(), Ok(WatchMode::LatestOnly));
        assert_eq!("watchLeadingOnly".parse(), Ok(WatchMode::LeadingOnly));
        assert_eq!(
            "takeSometimes".parse::<WatchMode>(),
            Err(UnknownWatchMode("takeSometimes".into()))
        );
    }

    #[test]
    fn test_default_mode_is_all() {
        assert_eq!(WatchMode::default(), WatchMode::All);
        assert_eq!(WatchMode::LatestOnly.to_string(), "watchLatestOnly");
    }
}
