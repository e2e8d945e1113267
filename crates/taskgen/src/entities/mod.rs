//! Core data structures for task generation.

mod collection;
mod complexity;
mod config;
mod subtask;
mod task;

pub use collection::{CollectionMetadata, TaskCollection};
pub use complexity::{ComplexityReport, ComplexityReportMeta, TaskComplexityAnalysis};
pub use config::{GlobalConfig, ModelConfig, ModelSettings, TasksConfig};
pub use subtask::Subtask;
pub use task::{Task, TaskPriority, TaskStatus};
