//! Configuration domain facade.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::ai::{anthropic, perplexity};
use crate::entities::TasksConfig;
use crate::errors::{TasksError, TasksResult};

/// Configuration domain facade
pub struct ConfigDomain {
    config_path: PathBuf,
}

impl ConfigDomain {
    /// Create a new config domain
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: project_path.as_ref().join(".taskgen/config.json"),
        }
    }

    /// Path of the config file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk; a missing file yields defaults
    pub async fn load(&self) -> TasksResult<TasksConfig> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => {
                let config: TasksConfig = serde_json::from_str(&content)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.config_path.display());
                Ok(TasksConfig::default())
            }
            Err(e) => Err(TasksError::FileReadError {
                path: self.config_path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Load configuration, apply process environment overrides and validate
    pub async fn load_effective(&self) -> TasksResult<TasksConfig> {
        let mut config = self.load().await?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration
    pub async fn save(&self, config: &TasksConfig) -> TasksResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, content)
            .await
            .map_err(|e| TasksError::FileWriteError {
                path: self.config_path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> TasksResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| TasksError::InvalidConfigValue {
            key: key.to_string(),
            reason: format!("'{raw}' could not be parsed"),
        })
}

fn parse_bool(key: &str, raw: &str) -> TasksResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(TasksError::InvalidConfigValue {
            key: key.to_string(),
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}

/// Apply environment-style overrides on top of a loaded config.
pub fn apply_env_overrides(
    config: &mut TasksConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> TasksResult<()> {
    if let Some(model) = lookup("MODEL") {
        config.models.main.model_id = model;
    }
    if let Some(raw) = lookup("TEMPERATURE") {
        config.models.main.temperature = parse_env("TEMPERATURE", &raw)?;
    }
    if let Some(raw) = lookup("MAX_TOKENS") {
        config.models.main.max_tokens = parse_env("MAX_TOKENS", &raw)?;
    }
    if let Some(raw) = lookup("DEFAULT_SUBTASKS") {
        config.global.default_subtasks = parse_env("DEFAULT_SUBTASKS", &raw)?;
    }
    if let Some(raw) = lookup("DEBUG") {
        config.global.debug = parse_bool("DEBUG", &raw)?;
    }
    if let Some(model) = lookup("PERPLEXITY_MODEL") {
        config.models.research.model_id = model;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.global.log_level = level;
    }
    if let Some(name) = lookup("PROJECT_NAME") {
        config.global.project_name = Some(name);
    }
    Ok(())
}

/// Backend credentials, resolved once at startup.
#[derive(Clone, Default)]
pub struct Credentials {
    pub primary: Option<String>,
    pub research: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary key-value lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            primary: non_empty(anthropic::API_KEY_ENV),
            research: non_empty(perplexity::API_KEY_ENV),
        }
    }

    /// Primary-backend key; missing is fatal.
    pub fn require_primary(&self) -> TasksResult<&str> {
        self.primary
            .as_deref()
            .ok_or_else(|| TasksError::CredentialMissing {
                backend: "anthropic".to_string(),
                env_var: anthropic::API_KEY_ENV.to_string(),
            })
    }

    /// Research-backend key; missing is fatal only in research mode.
    pub fn require_research(&self) -> TasksResult<&str> {
        self.research
            .as_deref()
            .ok_or_else(|| TasksError::CredentialMissing {
                backend: "perplexity".to_string(),
                env_var: perplexity::API_KEY_ENV.to_string(),
            })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("primary", &self.primary.as_ref().map(|_| "<redacted>"))
            .field("research", &self.research.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
