use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames emitted on the raw log WebSocket stream.
///
/// The stream opens with a `connected` handshake frame that consumers must
/// skip; only `log` frames carry displayable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogStreamFrame {
    /// Handshake acknowledging the subscription; carries no log content
    Connected,
    Log {
        timestamp: DateTime<Utc>,
        level: String,
        message: String,
        source: String,
    },
}

impl LogStreamFrame {
    /// Whether a consumer should render this frame
    pub fn is_consumable(&self) -> bool {
        !matches!(self, Self::Connected)
    }
}
