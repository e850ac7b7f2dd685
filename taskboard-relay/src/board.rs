//! In-memory task store: the canonical ordered collection of task records.
//!
//! The [`BoardStore`] owns a single flat `Vec<Task>`. Column membership is a
//! filter over the task status, and a task's index among the tasks sharing
//! its status is its render position in that column. All mutation goes
//! through the methods here; each one either fully applies or leaves the
//! collection untouched, so no observer ever sees a task removed but not
//! reinserted.

use chrono::Utc;
use uuid::Uuid;

use taskboard_proto::task::{
    Comment, Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus,
};

/// Errors reported by board mutations. All are non-fatal: the store is
/// unchanged and the caller decides how to report them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A task draft arrived without a usable title.
    #[error("task title must not be empty")]
    EmptyTitle,
    /// A comment arrived without any text.
    #[error("comment text must not be empty")]
    EmptyComment,
    /// The referenced task does not exist.
    #[error("no task with id {0}")]
    NotFound(TaskId),
}

/// The canonical ordered sequence of tasks.
#[derive(Debug, Default)]
pub struct BoardStore {
    tasks: Vec<Task>,
}

impl BoardStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Creates a store seeded with previously persisted tasks, preserving
    /// their order.
    #[must_use]
    pub const fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Number of tasks on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the board holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Read-only snapshot of the full collection in board order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Returns the task with the given id, if present.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Creates a task from a draft, assigning id and timestamps, and appends
    /// it to the end of the collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyTitle`] if the draft title is blank; the
    /// collection is unchanged.
    pub fn create(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(),
            title: draft.title,
            description: draft.description,
            status: draft.status.unwrap_or(TaskStatus::ToDo),
            priority: draft.priority.unwrap_or(Priority::Medium),
            category: draft.category,
            tags: draft.tags,
            due_date: draft.due_date,
            assignee: draft.assignee,
            attachments: draft.attachments,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Shallow-merges a patch into an existing task at its current position.
    ///
    /// Present fields replace the stored values wholesale; absent fields are
    /// left untouched. The id is never overwritten. `updated_at` is
    /// refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no task has the patch id.
    pub fn update(&mut self, patch: TaskPatch) -> Result<Task, StoreError> {
        let index = self
            .position(patch.id)
            .ok_or(StoreError::NotFound(patch.id))?;
        let task = &mut self.tasks[index];
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        if let Some(tags) = patch.tags {
            task.tags = tags;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(assignee) = patch.assignee {
            task.assignee = assignee;
        }
        if let Some(attachments) = patch.attachments {
            task.attachments = attachments;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Moves a task to `new_status` at `destination_index` within that
    /// column, using one positional algorithm for same-column reorders and
    /// cross-column moves alike.
    ///
    /// The task is removed from the collection, its status set, and it is
    /// reinserted before the task currently occupying `destination_index`
    /// in the destination column. An index at or past the end of the column
    /// appends after the column's last member; an empty column places the
    /// task at the end of the full collection. Tasks in other columns never
    /// change relative order.
    ///
    /// Returns the moved task and the status it left.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no task has the given id.
    pub fn move_task(
        &mut self,
        id: TaskId,
        new_status: TaskStatus,
        destination_index: usize,
    ) -> Result<(Task, TaskStatus), StoreError> {
        let from = self.position(id).ok_or(StoreError::NotFound(id))?;
        let mut task = self.tasks.remove(from);
        let old_status = task.status;
        task.status = new_status;
        task.updated_at = Utc::now();

        // Positions (in the full collection, task already removed) of the
        // destination column's members, in display order.
        let column: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == new_status)
            .map(|(i, _)| i)
            .collect();

        let insert_at = column.get(destination_index).copied().unwrap_or_else(|| {
            column.last().map_or(self.tasks.len(), |&last| last + 1)
        });
        self.tasks.insert(insert_at, task);
        Ok((self.tasks[insert_at].clone(), old_status))
    }

    /// Removes a task from the collection, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no task has the given id; the
    /// collection is unchanged.
    pub fn delete(&mut self, id: TaskId) -> Result<Task, StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        Ok(self.tasks.remove(index))
    }

    /// Appends a server-stamped comment to a task.
    ///
    /// The task's `updated_at` is left alone — a comment is not an edit of
    /// the task itself.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyComment`] for blank text, or
    /// [`StoreError::NotFound`] if no task has the given id.
    pub fn add_comment(
        &mut self,
        id: TaskId,
        text: &str,
        author: Uuid,
    ) -> Result<Comment, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::EmptyComment);
        }
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        let comment = Comment {
            id: Uuid::now_v7(),
            text: text.to_string(),
            author,
            created_at: Utc::now(),
        };
        self.tasks[index].comments.push(comment.clone());
        Ok(comment)
    }

    /// Replaces each stored task whose id matches a replacement, wholesale.
    ///
    /// Replacements with ids not on the board are ignored — bulk update
    /// never creates tasks. Returns a snapshot of the resulting collection.
    pub fn bulk_replace(&mut self, replacements: Vec<Task>) -> Vec<Task> {
        for task in &mut self.tasks {
            if let Some(replacement) = replacements.iter().find(|r| r.id == task.id) {
                *task = replacement.clone();
            }
        }
        self.snapshot()
    }
}
