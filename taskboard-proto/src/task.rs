//! Task data model for the `Taskboard` protocol.
//!
//! A board is a single flat ordered sequence of [`Task`] records. A task's
//! position in that sequence determines its render order within its status
//! column; columns are filter views over the sequence, not stored entities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a task — the column it lives in on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task has not been started.
    #[serde(rename = "To Do")]
    ToDo,
    /// Task is actively being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Task is finished.
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToDo => write!(f, "To Do"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default priority.
    Medium,
    /// Should be picked up soon.
    High,
    /// Drop everything.
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// Metadata for a file attached to a task. The relay never stores file
/// contents — only this descriptor, echoed back by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Original file name.
    pub name: String,
    /// MIME type of the file.
    #[serde(rename = "type")]
    pub media_type: String,
    /// File size in bytes.
    pub size: u64,
    /// URL the file can be retrieved from.
    pub url: String,
    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// A comment on a task. Append-only — comments are never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Server-assigned comment identifier.
    pub id: Uuid,
    /// Comment body (non-empty).
    pub text: String,
    /// Transient connection id of the viewer who wrote the comment.
    /// Not a durable user identity — it disappears on reconnect.
    #[serde(rename = "userId")]
    pub author: Uuid,
    /// When the comment was added.
    pub created_at: DateTime<Utc>,
}

/// One kanban card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Server-assigned identifier, immutable after creation.
    pub id: TaskId,
    /// Task title (non-empty).
    pub title: String,
    /// Longer free-form description.
    #[serde(default)]
    pub description: String,
    /// Column the task currently lives in.
    pub status: TaskStatus,
    /// Priority of the task.
    pub priority: Priority,
    /// Free-form category label, user-extensible.
    #[serde(default)]
    pub category: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Optional assignee reference (unvalidated).
    #[serde(default, rename = "assignedTo")]
    pub assignee: Option<String>,
    /// Attached file descriptors, in upload order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Comments, in append order.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Server-assigned creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update/move.
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a task: a [`Task`] missing its server-assigned
/// fields. Only `title` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Task title (must be non-empty — blank titles are rejected).
    #[serde(default)]
    pub title: String,
    /// Longer free-form description.
    #[serde(default)]
    pub description: String,
    /// Initial column; defaults to "To Do".
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Initial priority; defaults to Medium.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Free-form category label.
    #[serde(default)]
    pub category: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Optional assignee reference.
    #[serde(default, rename = "assignedTo")]
    pub assignee: Option<String>,
    /// Attachments already uploaded for this task.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Payload for updating a task: the id plus the fields to replace.
///
/// The merge is shallow — a present field replaces the stored value
/// wholesale, an absent field leaves it untouched. `due_date` and `assignee`
/// are double-`Option` so a JSON `null` clears the stored value while an
/// absent field keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// Which task to update. The stored id is never overwritten.
    pub id: TaskId,
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New tag list (replaces the whole list).
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// New due date; `null` clears it.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<NaiveDate>>,
    /// New assignee; `null` clears it.
    #[serde(
        default,
        rename = "assignedTo",
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee: Option<Option<String>>,
    /// New attachment list (replaces the whole list).
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

/// Deserializes a field so that an absent key stays `None` (via
/// `#[serde(default)]`) while an explicit `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
