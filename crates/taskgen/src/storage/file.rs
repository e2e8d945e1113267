//! File-based storage implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::debug;

use super::traits::Storage;
use crate::entities::{ComplexityReport, Subtask, TaskCollection};
use crate::errors::{TasksError, TasksResult};

/// File-based storage under `.taskgen/`
pub struct FileStorage {
    /// Project root path
    project_path: PathBuf,

    /// Path to tasks.json
    tasks_file: PathBuf,

    /// Path to the complexity report
    report_file: PathBuf,
}

impl FileStorage {
    /// Create a new file storage instance rooted at `project_path`
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        let data_dir = project_path.join(".taskgen");

        Self {
            tasks_file: data_dir.join("tasks").join("tasks.json"),
            report_file: data_dir.join("reports").join("task-complexity-report.json"),
            project_path,
        }
    }

    /// Get the project root path
    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Path of the tasks file
    pub fn tasks_file(&self) -> &Path {
        &self.tasks_file
    }

    /// Path of the complexity report
    pub fn report_file(&self) -> &Path {
        &self.report_file
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> TasksResult<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", path.display());
                Ok(None)
            }
            Err(e) => Err(TasksError::FileReadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> TasksResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content)
            .await
            .map_err(|e| TasksError::FileWriteError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn storage_type(&self) -> &'static str {
        "file"
    }

    async fn load_collection(&self) -> TasksResult<Option<TaskCollection>> {
        Self::read_json(&self.tasks_file).await
    }

    async fn save_collection(&self, collection: &TaskCollection) -> TasksResult<()> {
        Self::write_json(&self.tasks_file, collection).await
    }

    async fn save_subtasks(&self, task_id: u32, subtasks: Vec<Subtask>) -> TasksResult<()> {
        let mut collection = self
            .load_collection()
            .await?
            .ok_or(TasksError::TaskNotFound { task_id })?;

        collection
            .get_task_mut(task_id)
            .ok_or(TasksError::TaskNotFound { task_id })?
            .merge_subtasks(subtasks);

        self.save_collection(&collection).await
    }

    async fn load_report(&self) -> TasksResult<Option<ComplexityReport>> {
        Self::read_json(&self.report_file).await
    }

    async fn save_report(&self, report: &ComplexityReport) -> TasksResult<()> {
        Self::write_json(&self.report_file, report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CollectionMetadata, ComplexityReportMeta, Task};
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn sample_collection() -> TaskCollection {
        TaskCollection {
            tasks: vec![Task::new(1, "Setup", "Init"), Task::new(2, "API", "Routes")],
            metadata: CollectionMetadata {
                project_name: "demo".to_string(),
                total_tasks: 2,
                source_file: "prd.txt".to_string(),
                generated_at: "2026-10-14".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_missing_files_load_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert!(storage.load_collection().await.unwrap().is_none());
        assert!(storage.load_report().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_collection() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert_ok!(storage.save_collection(&sample_collection()).await);

        assert!(temp_dir.path().join(".taskgen/tasks/tasks.json").exists());
        let loaded = assert_ok!(storage.load_collection().await).unwrap();
        assert_eq!(loaded, sample_collection());
    }

    #[tokio::test]
    async fn test_save_subtasks_merges_into_parent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        storage.save_collection(&sample_collection()).await.unwrap();

        storage
            .save_subtasks(2, vec![Subtask::new(1, 0, "Router", "Add router")])
            .await
            .unwrap();

        let loaded = storage.load_collection().await.unwrap().unwrap();
        let task = loaded.get_task(2).unwrap();
        assert_eq!(task.subtasks.len(), 1);
        assert_eq!(task.subtasks[0].parent_task_id, 2);
    }

    #[tokio::test]
    async fn test_save_subtasks_unknown_task() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let err = assert_err!(storage.save_subtasks(1, Vec::new()).await);
        assert!(matches!(err, TasksError::TaskNotFound { task_id: 1 }));

        storage.save_collection(&sample_collection()).await.unwrap();
        let err = storage.save_subtasks(9, Vec::new()).await.unwrap_err();
        assert!(matches!(err, TasksError::TaskNotFound { task_id: 9 }));
    }

    #[tokio::test]
    async fn test_report_round_trip_location() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        let report = ComplexityReport {
            meta: ComplexityReportMeta {
                generated_at: "2026-10-14".to_string(),
                tasks_analyzed: 0,
                threshold_score: 5,
                project_name: None,
                used_research: false,
            },
            complexity_analysis: Vec::new(),
        };

        storage.save_report(&report).await.unwrap();

        assert!(storage.report_file().ends_with("reports/task-complexity-report.json"));
        assert_eq!(storage.load_report().await.unwrap(), Some(report));
    }
}
