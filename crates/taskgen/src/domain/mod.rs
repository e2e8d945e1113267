//! Domain facades for task generation.
//!
//! These facades combine the AI building blocks and configuration into the
//! operations the CLI exposes.

mod ai;
mod config;

pub use ai::{fallback_subtasks, AIDomain, RetryPolicy, DEFAULT_COMPLEXITY_THRESHOLD};
pub use config::{apply_env_overrides, ConfigDomain, Credentials};
