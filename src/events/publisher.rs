use super::delta::ScenarioDelta;
use crate::constants::{events, DEFAULT_CHANNEL_CAPACITY};
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast publisher for scenario deltas.
///
/// Delivery is best-effort: subscribers that lag behind the channel capacity
/// lose deltas (observed as `Lagged` on their receiver), and consumers must
/// not rely on cross-delta ordering. The store-side reconciler compensates
/// with an authoritative refetch backstop.
#[derive(Debug, Clone)]
pub struct DeltaPublisher {
    sender: broadcast::Sender<ScenarioDelta>,
}

impl DeltaPublisher {
    /// Create a publisher with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a delta. Publishing with zero subscribers is not an error —
    /// the pipeline emits deltas whether or not a dashboard is watching.
    pub fn publish(&self, delta: ScenarioDelta) {
        trace!(
            event = events::SCENARIO_UPDATE,
            scenario_id = %delta.scenario_id,
            "delta published"
        );
        let _ = self.sender.send(delta);
    }

    /// Subscribe to the delta stream
    pub fn subscribe(&self) -> broadcast::Receiver<ScenarioDelta> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for DeltaPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
