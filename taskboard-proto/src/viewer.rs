//! Connected-viewer types for online roster tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One active real-time connection to the relay.
///
/// A viewer is not a durable account: the id is assigned per connection and
/// discarded on disconnect. A reconnecting client is a new viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    /// Transient per-connection identifier.
    pub id: Uuid,
    /// When the connection was opened.
    pub connected_at: DateTime<Utc>,
}

impl Viewer {
    /// Creates a viewer record for a connection opened now.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
        }
    }
}
