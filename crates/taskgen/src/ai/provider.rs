//! Backend traits and common types.
//!
//! Defines the two capability interfaces the orchestrator talks to, plus the
//! shared failure classification used by every vendor adapter.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::{TasksError, TasksResult};

/// A rendered (system, user) prompt pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Token usage information from an AI response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: u32,
    /// Number of output tokens
    pub output_tokens: u32,
    /// Total tokens (input + output)
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// Accumulate usage across attempts.
    pub fn add(&mut self, other: Self) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// Response from an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIResponse {
    /// Full generated text
    pub text: String,
    /// Token usage information
    pub usage: TokenUsage,
    /// Model that generated the response
    pub model: String,
    /// Provider that generated the response
    pub provider: String,
}

/// Options for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    /// Model identifier
    pub model: String,
    /// Temperature for sampling (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Primary text-generation backend.
///
/// Implementations classify their failures into the `TasksError` backend
/// variants; callers never inspect vendor error shapes.
#[async_trait]
pub trait GeneratorBackend: Send + Sync {
    /// Provider name (e.g., "anthropic").
    fn name(&self) -> &'static str;

    /// Run one completion and return the full response text.
    async fn complete(
        &self,
        prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse>;
}

/// Secondary retrieval-augmented backend used for research.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    /// Provider name (e.g., "perplexity").
    fn name(&self) -> &'static str;

    /// Answer one research query with prose.
    async fn complete(
        &self,
        prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse>;
}

/// Classify a non-success backend response.
///
/// `error_type` is the vendor's machine-readable error kind when the body
/// carried one; it takes precedence over the HTTP status.
pub fn classify_backend_error(
    status: Option<StatusCode>,
    error_type: Option<&str>,
    detail: impl Into<String>,
) -> TasksError {
    let detail = detail.into();
    let kind = error_type.unwrap_or_default().to_ascii_lowercase();
    let code = status.map(|s| s.as_u16());

    match kind.as_str() {
        "rate_limit_error" | "overloaded_error" | "rate_limit_exceeded" | "insufficient_quota"
        | "resource_exhausted" => return TasksError::QuotaExhausted { detail },
        "timeout_error" | "request_timeout" => return TasksError::Timeout { detail },
        "authentication_error" | "permission_error" | "invalid_api_key" => {
            return TasksError::PermissionDenied { detail }
        }
        "invalid_request_error" | "not_found_error" | "request_too_large" => {
            return TasksError::InvalidRequest { detail }
        }
        _ => {}
    }

    match code {
        Some(429 | 529) => TasksError::QuotaExhausted { detail },
        Some(408 | 504) => TasksError::Timeout { detail },
        Some(401 | 403) => TasksError::PermissionDenied { detail },
        Some(400 | 404 | 413 | 422) => TasksError::InvalidRequest { detail },
        _ => TasksError::Backend { detail },
    }
}

/// Classify a transport-level failure (no usable HTTP response).
pub fn classify_transport_error(err: &reqwest::Error) -> TasksError {
    let detail = err.to_string();
    if err.is_timeout() {
        TasksError::Timeout { detail }
    } else if err.is_connect() || err.is_request() || err.is_body() {
        TasksError::NetworkError { detail }
    } else if let Some(status) = err.status() {
        classify_backend_error(Some(status), None, detail)
    } else {
        TasksError::Backend { detail }
    }
}
