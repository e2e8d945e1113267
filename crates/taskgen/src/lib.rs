#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_inception)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

//! # Taskgen
//!
//! Turns a Product Requirements Document into a backlog of development tasks
//! with an AI backend, and expands tasks into subtasks.
//!
//! This crate provides:
//! - PRD breakdown into a validated task collection
//! - Subtask expansion with optional research augmentation
//! - Task complexity analysis
//! - File-based storage in the `.taskgen/` directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskgen::{AIDomain, ConfigDomain, Credentials, SpinnerReporter};
//!
//! let config = ConfigDomain::new(".").load_effective().await?;
//! let ai = AIDomain::from_config(config, &Credentials::from_env(), Arc::new(SpinnerReporter))?;
//!
//! let (collection, usage) = ai.breakdown_prd(&prd, "docs/prd.txt", 10).await?;
//! ```

// Core entities
pub mod entities;

// Error types
pub mod errors;

// Storage layer
pub mod storage;

// Domain facades
pub mod domain;

// Terminal UI helpers
pub mod ui;

// AI integration
pub mod ai;

// Re-export key types for convenience
pub use ai::{GeneratorBackend, ResearchBackend, TokenUsage};
pub use domain::{AIDomain, ConfigDomain, Credentials, RetryPolicy};
pub use entities::{
    ComplexityReport, Subtask, Task, TaskCollection, TaskPriority, TaskStatus, TasksConfig,
};
pub use errors::{TasksError, TasksResult};
pub use storage::{FileStorage, Storage};
pub use ui::{ProgressReporter, SilentReporter, SpinnerReporter};
