//! Storage trait definitions.

use async_trait::async_trait;

use crate::entities::{ComplexityReport, Subtask, TaskCollection};
use crate::errors::TasksResult;

/// Storage interface for generated task data
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get storage type identifier
    fn storage_type(&self) -> &'static str;

    // === Task Operations ===

    /// Load the persisted collection, if any
    async fn load_collection(&self) -> TasksResult<Option<TaskCollection>>;

    /// Persist a collection, replacing any previous one
    async fn save_collection(&self, collection: &TaskCollection) -> TasksResult<()>;

    /// Merge expanded subtasks into their parent task and persist
    async fn save_subtasks(&self, task_id: u32, subtasks: Vec<Subtask>) -> TasksResult<()>;

    // === Report Operations ===

    /// Load the persisted complexity report, if any
    async fn load_report(&self) -> TasksResult<Option<ComplexityReport>>;

    /// Persist a complexity report
    async fn save_report(&self, report: &ComplexityReport) -> TasksResult<()>;
}
