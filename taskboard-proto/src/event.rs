//! Event surface between viewers and the relay.
//!
//! Events travel as JSON text frames shaped `{"event": "...", "data": ...}`.
//! [`ClientEvent`] covers mutation intents and sync requests from a viewer;
//! [`ServerEvent`] covers broadcasts and private replies from the relay.

use serde::{Deserialize, Serialize};

use crate::activity::ActivityRecord;
use crate::task::{Comment, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
use crate::viewer::Viewer;

/// A move intent: which task, which destination column, and where in that
/// column the card was dropped.
///
/// `source_index`, `source_column`, and `destination_column` are sent by
/// drag-and-drop clients but carry no authority: the relay recomputes the
/// insertion point from the destination status and index alone, so
/// same-column reorders and cross-column moves follow one algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    /// Which task to move.
    pub id: TaskId,
    /// Destination column.
    pub status: TaskStatus,
    /// Zero-based drop position within the destination column.
    pub destination_index: usize,
    /// Position the card was picked up from (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    /// Column the card was picked up from (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<TaskStatus>,
    /// Column the card was dropped in (informational, duplicates `status`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_column: Option<TaskStatus>,
}

/// Mutation intents and sync requests sent by a viewer to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Create a task from a draft; the relay assigns id and timestamps.
    CreateTask(TaskDraft),
    /// Shallow-merge fields into an existing task.
    UpdateTask(TaskPatch),
    /// Move a task within or across columns.
    MoveTask(MoveRequest),
    /// Delete a task by id.
    DeleteTask(TaskId),
    /// Append a comment to a task.
    #[serde(rename_all = "camelCase")]
    AddComment {
        /// Which task to comment on.
        task_id: TaskId,
        /// Comment body (non-empty).
        text: String,
    },
    /// Replace matching tasks wholesale; unknown ids are ignored.
    BulkUpdateTasks(Vec<Task>),
    /// Ask for a private full resend of the canonical state.
    RequestSync,
}

/// Events emitted by the relay, either broadcast to every viewer or sent
/// privately to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A task was created (broadcast).
    TaskCreated(Task),
    /// A task was updated (broadcast).
    TaskUpdated(Task),
    /// A task was deleted (broadcast).
    TaskDeleted(TaskId),
    /// The full canonical collection, in board order. Broadcast after a
    /// move or bulk update; sent privately on connect and on request-sync.
    TasksSynced(Vec<Task>),
    /// A comment was appended (broadcast).
    #[serde(rename_all = "camelCase")]
    CommentAdded {
        /// The task the comment belongs to.
        task_id: TaskId,
        /// The appended comment.
        comment: Comment,
    },
    /// A new activity record was appended (broadcast).
    ActivityAdded(ActivityRecord),
    /// A newest-first slice of the activity log (private, on connect and
    /// on request-sync).
    ActivitySynced(Vec<ActivityRecord>),
    /// The current online roster.
    ViewersOnline(Vec<Viewer>),
    /// Number of connected viewers. Broadcast on every connect/disconnect.
    ViewersCount(u32),
    /// A request failed; sent only to the viewer that issued it.
    Error {
        /// Human-readable error description.
        reason: String,
    },
}
