//! Subtask entity.

use serde::{Deserialize, Serialize};

use super::task::TaskStatus;

/// Subtask structure (nested within tasks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    /// Numeric ID within parent task
    pub id: u32,

    /// Owning task ID
    #[serde(rename = "parentTaskId")]
    pub parent_task_id: u32,

    /// Brief, descriptive title
    pub title: String,

    /// Concise description
    pub description: String,

    /// Implementation details
    #[serde(default)]
    pub details: String,

    /// Sibling subtask IDs this subtask depends on
    #[serde(default)]
    pub dependencies: Vec<u32>,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,
}

impl Subtask {
    /// Create a new pending subtask
    pub fn new(
        id: u32,
        parent_task_id: u32,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parent_task_id,
            title: title.into(),
            description: description.into(),
            details: String::new(),
            dependencies: Vec::new(),
            status: TaskStatus::default(),
        }
    }

    /// Placeholder used when generation cannot produce real subtasks.
    pub fn fallback(id: u32, parent_task_id: u32) -> Self {
        let mut subtask = Self::new(
            id,
            parent_task_id,
            format!("Subtask {id}"),
            "Auto-generated fallback subtask",
        );
        subtask.details = "This subtask was auto-generated because AI generation failed. \
                           Edit it with specific implementation details."
            .to_string();
        subtask
    }

    /// Get full ID (parentTaskId.subtaskId format)
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.parent_task_id, self.id)
    }
}
