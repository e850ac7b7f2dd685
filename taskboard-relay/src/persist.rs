//! Best-effort JSON file persistence for board state.
//!
//! The task collection and the activity log are each dumped as one JSON
//! document, fully overwritten on every save and reloaded at process start.
//! Persistence never fails a mutation: write errors are logged and
//! swallowed, and the in-memory state stays authoritative. A missing or
//! unreadable file at startup simply yields an empty board.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use taskboard_proto::activity::ActivityRecord;
use taskboard_proto::task::Task;

/// Writes and reloads the two board state documents under a data directory.
#[derive(Debug, Clone)]
pub struct Persister {
    tasks_path: PathBuf,
    activity_path: PathBuf,
}

impl Persister {
    /// Creates a persister rooted at `data_dir` (`tasks.json` and
    /// `activity.json` inside it).
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            tasks_path: data_dir.join("tasks.json"),
            activity_path: data_dir.join("activity.json"),
        }
    }

    /// Loads both documents, tolerating missing or corrupt files.
    ///
    /// Returns the persisted tasks in board order and the activity records
    /// newest first, as they were saved.
    #[must_use]
    pub fn load(&self) -> (Vec<Task>, Vec<ActivityRecord>) {
        (
            load_json(&self.tasks_path),
            load_json(&self.activity_path),
        )
    }

    /// Overwrites the task document. Errors are logged and swallowed.
    pub async fn save_tasks(&self, tasks: &[Task]) {
        save_json(&self.tasks_path, tasks).await;
    }

    /// Overwrites the activity document. Errors are logged and swallowed.
    pub async fn save_activity(&self, records: &[ActivityRecord]) {
        save_json(&self.activity_path, records).await;
    }
}

/// Reads and parses a JSON array document; any failure yields an empty list.
fn load_json<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read state file");
            return Vec::new();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "state file is corrupt, starting from empty"
            );
            Vec::new()
        }
    }
}

/// Serializes `value` and overwrites `path`, creating the parent directory
/// if needed. Failures are logged and swallowed.
async fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) {
    let bytes = match serde_json::to_vec_pretty(value) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to serialize state");
            return;
        }
    };
    if let Some(parent) = path.parent()
        && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
        tracing::warn!(dir = %parent.display(), error = %e, "failed to create data directory");
        return;
    }
    if let Err(e) = tokio::fs::write(path, bytes).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to write state file");
    }
}
