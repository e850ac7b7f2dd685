//! Connected-viewer roster.
//!
//! Tracks which viewers currently hold an open WebSocket connection. Each
//! entry is transient: created when the socket opens, destroyed when it
//! closes. The roster exists only to answer "how many viewers" and "who is
//! online right now" — it carries no durable identity.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use taskboard_proto::viewer::Viewer;

/// In-memory roster of connected viewers, keyed by transient connection id.
#[derive(Debug, Default)]
pub struct Roster {
    viewers: RwLock<HashMap<Uuid, Viewer>>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
        }
    }

    /// Records a newly connected viewer and returns its roster entry.
    pub async fn join(&self, id: Uuid) -> Viewer {
        let viewer = Viewer::new(id);
        let mut viewers = self.viewers.write().await;
        viewers.insert(id, viewer.clone());
        drop(viewers);
        viewer
    }

    /// Removes a viewer, returning `true` if it was present.
    pub async fn leave(&self, id: Uuid) -> bool {
        let mut viewers = self.viewers.write().await;
        viewers.remove(&id).is_some()
    }

    /// Number of currently connected viewers.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn count(&self) -> u32 {
        let viewers = self.viewers.read().await;
        // Connection counts stay far below u32::MAX.
        viewers.len() as u32
    }

    /// Snapshot of the online roster, ordered by connection time.
    pub async fn snapshot(&self) -> Vec<Viewer> {
        let viewers = self.viewers.read().await;
        let mut online: Vec<Viewer> = viewers.values().cloned().collect();
        online.sort_by_key(|v| v.connected_at);
        online
    }
}
