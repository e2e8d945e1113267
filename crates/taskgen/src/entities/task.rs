//! Task entity and related types.

use serde::{Deserialize, Serialize};

use super::Subtask;
use crate::errors::TasksError;

/// Task status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Review,
    Done,
    Deferred,
    Cancelled,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Review => write!(f, "review"),
            Self::Done => write!(f, "done"),
            Self::Deferred => write!(f, "deferred"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Task priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = TasksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TasksError::InvalidPriority {
                priority: s.to_string(),
            }),
        }
    }
}

/// Core task structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Sequential identifier, starting at 1 within a collection
    pub id: u32,

    /// Brief, descriptive title
    pub title: String,

    /// Concise description of what the task involves
    pub description: String,

    /// Current task status
    #[serde(default)]
    pub status: TaskStatus,

    /// Task priority level
    #[serde(default)]
    pub priority: TaskPriority,

    /// IDs of prerequisite tasks
    #[serde(default)]
    pub dependencies: Vec<u32>,

    /// In-depth implementation instructions
    #[serde(default)]
    pub details: String,

    /// Verification approach
    #[serde(default, rename = "testStrategy")]
    pub test_strategy: String,

    /// List of subtasks
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Create a new pending task with minimal required fields
    pub fn new(id: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            dependencies: Vec::new(),
            details: String::new(),
            test_strategy: String::new(),
            subtasks: Vec::new(),
        }
    }

    /// Get next available subtask ID
    pub fn next_subtask_id(&self) -> u32 {
        self.subtasks
            .iter()
            .map(|s| s.id)
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }

    /// Append expanded subtasks, re-parenting them to this task.
    pub fn merge_subtasks(&mut self, subtasks: impl IntoIterator<Item = Subtask>) {
        let parent = self.id;
        self.subtasks.extend(subtasks.into_iter().map(|mut s| {
            s.parent_task_id = parent;
            s
        }));
    }

    /// Get subtask by ID
    pub fn get_subtask(&self, subtask_id: u32) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new(1, "Test Task", "A test task description");
        assert_eq!(task.id, 1);
        assert_eq!(task.title, "Test Task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!(" High ".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert_eq!("med".parse::<TaskPriority>().unwrap(), TaskPriority::Medium);
        assert!("critical".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut task = Task::new(3, "Title", "Desc");
        task.test_strategy = "unit tests".to_string();
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["testStrategy"], "unit tests");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["priority"], "medium");
    }

    #[test]
    fn test_merge_subtasks_reparents() {
        let mut task = Task::new(4, "Parent", "Desc");
        task.merge_subtasks(vec![Subtask::new(1, 99, "Sub", "Desc")]);
        assert_eq!(task.subtasks[0].parent_task_id, 4);
        assert_eq!(task.next_subtask_id(), 2);
        assert!(task.get_subtask(1).is_some());
    }
}
