//! Activity record types for the `Taskboard` protocol.
//!
//! Every successful board mutation produces one [`ActivityRecord`]. Records
//! are immutable after creation and snapshot the task title at mutation time:
//! renaming a task later does not rewrite its history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{Task, TaskId, TaskStatus};

/// Which kind of mutation an activity record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// A task was created.
    Create,
    /// A task's fields were updated.
    Update,
    /// A task was moved within or across columns.
    Move,
    /// A task was deleted.
    Delete,
    /// A comment was added to a task.
    Comment,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Move => write!(f, "move"),
            Self::Delete => write!(f, "delete"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// One append-only audit entry summarizing a board mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Which kind of mutation happened.
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// The affected task.
    pub task_id: TaskId,
    /// The task title at the time of the mutation (denormalized snapshot).
    pub task_title: String,
    /// Column the task left. Present only on move records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<TaskStatus>,
    /// Column the task entered. Present only on move records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<TaskStatus>,
    /// Transient connection id of the viewer that issued the mutation.
    #[serde(rename = "userId")]
    pub author: Uuid,
    /// When the mutation happened.
    pub timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    /// Builds a record for a non-move mutation of `task` by `author`.
    #[must_use]
    pub fn new(kind: ActivityKind, task: &Task, author: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            task_id: task.id,
            task_title: task.title.clone(),
            old_status: None,
            new_status: None,
            author,
            timestamp: Utc::now(),
        }
    }

    /// Builds a move record, capturing the column transition.
    #[must_use]
    pub fn moved(task: &Task, old_status: TaskStatus, author: Uuid) -> Self {
        Self {
            old_status: Some(old_status),
            new_status: Some(task.status),
            ..Self::new(ActivityKind::Move, task, author)
        }
    }
}
