//! Error types for the taskgen crate.

use thiserror::Error;

/// Comprehensive error types for task generation
///
/// Backend failures are classified into a small set of variants whose
/// `Display` output is the user-facing message. The vendor's own wording is
/// kept in `detail` and only surfaces in debug logging.
#[derive(Error, Debug, Clone)]
pub enum TasksError {
    // Credential errors
    #[error("Missing credential: set {env_var} to use the {backend} backend")]
    CredentialMissing { backend: String, env_var: String },

    // Retryable backend errors
    #[error("The AI service quota or rate limit was exceeded. Wait a moment and try again.")]
    QuotaExhausted { detail: String },

    #[error("The AI service took too long to respond.")]
    Timeout { detail: String },

    #[error("Could not reach the AI service. Check your network connection.")]
    NetworkError { detail: String },

    // Fatal backend errors
    #[error("The AI service rejected the credential. Check that your API key is valid and has access to the configured model.")]
    PermissionDenied { detail: String },

    #[error("The AI service rejected the request as malformed. Check the configured model and token limits.")]
    InvalidRequest { detail: String },

    #[error("The AI service returned an unexpected error.")]
    Backend { detail: String },

    // Response handling errors
    #[error("Could not extract a valid response from the AI output: {reason}")]
    ExtractionFailed { reason: String },

    #[error("Research is unavailable: {reason}")]
    ResearchUnavailable { reason: String },

    // Task errors
    #[error("Task '{task_id}' not found")]
    TaskNotFound { task_id: u32 },

    #[error("Invalid priority: '{priority}'")]
    InvalidPriority { priority: String },

    // Storage errors
    #[error("Storage error: {reason}")]
    StorageError { reason: String },

    #[error("Failed to read file '{path}': {reason}")]
    FileReadError { path: String, reason: String },

    #[error("Failed to write file '{path}': {reason}")]
    FileWriteError { path: String, reason: String },

    #[error("Failed to parse JSON: {reason}")]
    JsonParseError { reason: String },

    // Configuration errors
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidConfigValue { key: String, reason: String },

    // General errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl TasksError {
    /// Whether a fresh attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QuotaExhausted { .. } | Self::Timeout { .. } | Self::NetworkError { .. }
        )
    }

    /// Backend-provided detail for classified failures, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::QuotaExhausted { detail }
            | Self::Timeout { detail }
            | Self::NetworkError { detail }
            | Self::PermissionDenied { detail }
            | Self::InvalidRequest { detail }
            | Self::Backend { detail } => Some(detail),
            _ => None,
        }
    }

    /// Shorthand for an extraction failure.
    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for TasksError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TasksError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParseError {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for taskgen operations
pub type TasksResult<T> = Result<T, TasksError>;
