//! Task collection produced by a PRD breakdown.

use serde::{Deserialize, Serialize};

use super::Task;

/// Collection metadata; synthesized when the model omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(rename = "projectName")]
    pub project_name: String,

    #[serde(rename = "totalTasks")]
    pub total_tasks: usize,

    #[serde(rename = "sourceFile")]
    pub source_file: String,

    /// ISO calendar date (`YYYY-MM-DD`)
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
}

/// Persisted result of a PRD breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCollection {
    pub tasks: Vec<Task>,
    pub metadata: CollectionMetadata,
}

impl TaskCollection {
    /// Get task by ID
    pub fn get_task(&self, task_id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Get mutable task by ID
    pub fn get_task_mut(&mut self, task_id: u32) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }
}
