use super::scenario_store::ScenarioStore;
use crate::events::{DeltaPublisher, ScenarioDelta};
use crate::models::Scenario;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// Errors from the authoritative scenario source
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DirectoryError {
    #[error("Scenario directory unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative source of the full scenario list, used for the
/// reconciliation backstop refetch
#[async_trait]
pub trait ScenarioDirectory: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Scenario>, DirectoryError>;
}

/// Applies broadcast deltas to the store and keeps it consistent.
///
/// Deltas are best-effort: they may be dropped (channel lag) or reordered.
/// The reconciler therefore refetches the authoritative list whenever it
/// sees a terminal-status delta or a `Lagged` notification. A failed refetch
/// leaves the previous cached state intact.
pub struct Reconciler {
    store: Arc<ScenarioStore>,
    directory: Arc<dyn ScenarioDirectory>,
    receiver: broadcast::Receiver<ScenarioDelta>,
    cancel: watch::Receiver<bool>,
}

impl Reconciler {
    pub fn new(
        store: Arc<ScenarioStore>,
        directory: Arc<dyn ScenarioDirectory>,
        publisher: &DeltaPublisher,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            directory,
            receiver: publisher.subscribe(),
            cancel,
        }
    }

    /// Run until the delta channel closes or the cancellation token drops
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                changed = self.cancel.changed() => {
                    // Err means the sender half was dropped; both cases stop the loop
                    if changed.is_err() || *self.cancel.borrow() {
                        debug!("reconciler cancelled");
                        return;
                    }
                }
                received = self.receiver.recv() => match received {
                    Ok(delta) => {
                        let terminal = delta.is_terminal();
                        self.store.apply_delta(&delta);
                        if terminal {
                            debug!(scenario_id = %delta.scenario_id, "terminal delta, refetching");
                            self.refetch().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "delta channel lagged, refetching");
                        self.drain_backlog();
                        self.refetch().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("delta channel closed, reconciler stopping");
                        return;
                    }
                },
            }
        }
    }

    /// Discard the deltas still buffered after a lag. They predate the
    /// deltas the channel already dropped, so applying them after the
    /// refetch would regress the cache.
    fn drain_backlog(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return,
            }
        }
    }

    /// Authoritative reload; a failure keeps the previous cached state
    async fn refetch(&self) {
        match self.directory.fetch_all().await {
            Ok(snapshot) => self.store.replace_all(snapshot),
            Err(error) => warn!(%error, "refetch failed, keeping cached state"),
        }
    }
}
