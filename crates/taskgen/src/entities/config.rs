//! Configuration entities.

use serde::{Deserialize, Serialize};

use crate::errors::{TasksError, TasksResult};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TasksConfig {
    /// AI model configurations
    #[serde(default)]
    pub models: ModelConfig,

    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,
}

impl TasksConfig {
    /// Check value ranges the backends rely on.
    pub fn validate(&self) -> TasksResult<()> {
        for (role, settings) in [("main", &self.models.main), ("research", &self.models.research)] {
            if !(0.0..=1.0).contains(&settings.temperature) {
                return Err(TasksError::InvalidConfigValue {
                    key: format!("models.{role}.temperature"),
                    reason: format!("{} is outside 0.0-1.0", settings.temperature),
                });
            }
            if settings.max_tokens == 0 {
                return Err(TasksError::InvalidConfigValue {
                    key: format!("models.{role}.maxTokens"),
                    reason: "must be a positive integer".to_string(),
                });
            }
            if settings.model_id.trim().is_empty() {
                return Err(TasksError::InvalidConfigValue {
                    key: format!("models.{role}.modelId"),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if self.global.default_subtasks == 0 {
            return Err(TasksError::InvalidConfigValue {
                key: "global.defaultSubtasks".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }

        Ok(())
    }
}

/// Model configuration for AI providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Main model for generation
    #[serde(default)]
    pub main: ModelSettings,

    /// Research model
    #[serde(default = "ModelSettings::research")]
    pub research: ModelSettings,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            main: ModelSettings::default(),
            research: ModelSettings::research(),
        }
    }
}

/// Individual model settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    /// Provider name (e.g., "anthropic", "perplexity")
    pub provider: String,

    /// Model ID
    #[serde(rename = "modelId")]
    pub model_id: String,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: u32,

    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional base URL override
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "baseURL")]
    pub base_url: Option<String>,
}

const fn default_max_tokens() -> u32 {
    64000
}

const fn default_temperature() -> f32 {
    0.2
}

impl ModelSettings {
    /// Default research model settings.
    pub fn research() -> Self {
        Self {
            provider: "perplexity".to_string(),
            model_id: "sonar-pro".to_string(),
            max_tokens: 8700,
            temperature: 0.1,
            base_url: None,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model_id: "claude-sonnet-4-20250514".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: None,
        }
    }
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// Log level
    #[serde(default = "default_log_level", rename = "logLevel")]
    pub log_level: String,

    /// Debug mode (verbose diagnostics, raw backend payloads)
    #[serde(default)]
    pub debug: bool,

    /// Default number of tasks when parsing PRD
    #[serde(default = "default_num_tasks", rename = "defaultNumTasks")]
    pub default_num_tasks: u32,

    /// Default number of subtasks when expanding
    #[serde(default = "default_subtasks", rename = "defaultSubtasks")]
    pub default_subtasks: u32,

    /// Project name
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "projectName"
    )]
    pub project_name: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

const fn default_num_tasks() -> u32 {
    10
}

const fn default_subtasks() -> u32 {
    5
}

impl GlobalConfig {
    /// Default tracing filter when `RUST_LOG` is unset. Debug mode wins.
    pub fn log_directive(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            self.log_level.trim()
        }
    }

    /// Inclusive range of subtask counts a complexity analysis may recommend.
    pub fn recommended_subtask_range(&self) -> (u32, u32) {
        let low = self.default_subtasks.saturating_sub(1).max(3);
        let high = (self.default_subtasks + 2).min(8);
        (low, high.max(low))
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            debug: false,
            default_num_tasks: default_num_tasks(),
            default_subtasks: default_subtasks(),
            project_name: None,
        }
    }
}
