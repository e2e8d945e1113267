//! Perplexity research backend (OpenAI-compatible chat completions).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{TasksError, TasksResult};

use super::provider::{
    classify_backend_error, classify_transport_error, AIResponse, GenerateOptions, PromptPair,
    ResearchBackend, TokenUsage,
};

/// Perplexity API endpoint
const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai/chat/completions";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

/// Research queries are short; fail faster than generation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize, Default)]
#[allow(clippy::struct_field_names)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

/// Perplexity provider.
pub struct PerplexityProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PerplexityProvider {
    /// Create a new Perplexity provider with an API key.
    pub fn new(api_key: impl Into<String>) -> TasksResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TasksError::ConfigError {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: PERPLEXITY_API_URL.to_string(),
        })
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(prompt: &PromptPair, options: &GenerateOptions) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if !prompt.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: prompt.system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt.user.clone(),
        });

        ChatRequest {
            model: options.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

#[async_trait]
impl ResearchBackend for PerplexityProvider {
    fn name(&self) -> &'static str {
        "perplexity"
    }

    async fn complete(
        &self,
        prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse> {
        let request = Self::build_request(prompt, options);

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ChatErrorResponse>(&body) {
                Ok(error_response) => {
                    let error = error_response.error;
                    let kind = error.error_type.or_else(|| {
                        error
                            .code
                            .as_ref()
                            .and_then(|c| c.as_str().map(str::to_string))
                    });
                    classify_backend_error(Some(status), kind.as_deref(), error.message)
                }
                Err(_) => classify_backend_error(Some(status), None, format!("({status}) {body}")),
            });
        }

        let api_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| TasksError::Backend {
                detail: format!("Failed to parse research response: {e}"),
            })?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(AIResponse {
            text,
            usage: TokenUsage::new(
                api_response.usage.prompt_tokens,
                api_response.usage.completion_tokens,
            ),
            model: api_response.model.unwrap_or_else(|| options.model.clone()),
            provider: "perplexity".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = PerplexityProvider::new("pplx-test").unwrap();
        assert_eq!(provider.name(), "perplexity");
    }

    #[test]
    fn test_message_conversion() {
        let prompt = PromptPair::new("Be precise", "How do I stream SSE in axum?");
        let options = GenerateOptions::new("sonar-pro").with_temperature(0.1);

        let request = PerplexityProvider::build_request(&prompt, &options);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "user");
        assert_eq!(request.temperature, Some(0.1));
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let prompt = PromptPair::new("", "query");
        let request =
            PerplexityProvider::build_request(&prompt, &GenerateOptions::new("sonar-pro"));
        assert_eq!(request.messages.len(), 1);
    }
}
