//! Anthropic Claude generator backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{TasksError, TasksResult};

use super::provider::{
    classify_backend_error, classify_transport_error, AIResponse, GenerateOptions,
    GeneratorBackend, PromptPair, TokenUsage,
};

/// Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Normalize model name to the canonical API model name.
fn normalize_model(model: &str) -> &str {
    match model {
        "opus" => "claude-opus-4-1-20250805",
        "sonnet" => "claude-sonnet-4-20250514",
        "haiku" => "claude-3-5-haiku-20241022",
        _ => model,
    }
}

/// Anthropic API request message
#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

/// Anthropic API request
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

/// Anthropic API error
#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Anthropic API error response
#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

/// Streaming event types
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: StreamMessage },
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: ContentDelta },
    #[serde(rename = "message_delta")]
    MessageDelta { usage: Option<StreamUsage> },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: AnthropicError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    model: String,
    usage: StreamUsage,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ContentDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: String,
}

/// Accumulated state of one streamed message.
#[derive(Debug, Default)]
struct StreamState {
    text: String,
    model: Option<String>,
    input_tokens: u32,
    output_tokens: u32,
}

impl StreamState {
    /// Apply one `data:` payload.
    fn apply(&mut self, data: &str) -> TasksResult<()> {
        let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
            tracing::trace!("Skipping unparsable stream event: {data}");
            return Ok(());
        };

        match event {
            StreamEvent::MessageStart { message } => {
                self.model = Some(message.model);
                self.input_tokens = message.usage.input_tokens;
                tracing::debug!("Input tokens: {}", self.input_tokens);
            }
            StreamEvent::ContentBlockDelta { delta } if delta.delta_type == "text_delta" => {
                self.text.push_str(&delta.text);
            }
            StreamEvent::MessageDelta { usage: Some(u) } => {
                self.output_tokens = u.output_tokens;
            }
            StreamEvent::MessageStop => {
                tracing::debug!(
                    "Output tokens: {}, chars: {}",
                    self.output_tokens,
                    self.text.len()
                );
            }
            StreamEvent::Error { error } => {
                return Err(classify_backend_error(
                    None,
                    Some(&error.error_type),
                    format!("{} - {}", error.error_type, error.message),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Apply every `data:` line of one SSE event.
    fn apply_event(&mut self, event: &str) -> TasksResult<()> {
        for line in event.lines() {
            if let Some(data) = line.strip_prefix("data: ") {
                if data != "[DONE]" {
                    self.apply(data)?;
                }
            }
        }
        Ok(())
    }
}

/// Splits raw stream bytes into complete SSE events.
///
/// Bytes are held until the blank line ending an event arrives, so a
/// multi-byte character split across network chunks is decoded whole.
#[derive(Debug, Default)]
struct EventDecoder {
    buffer: Vec<u8>,
}

impl EventDecoder {
    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete event, if one is buffered.
    fn next_event(&mut self) -> Option<String> {
        let end = self.buffer.windows(2).position(|w| w == b"\n\n")?;
        let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
        Some(String::from_utf8_lossy(&event).into_owned())
    }

    /// Whatever remains once the stream has ended.
    fn finish(self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}

fn build_client(timeout: Duration) -> TasksResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TasksError::ConfigError {
            reason: format!("Failed to build HTTP client: {e}"),
        })
}

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an API key.
    pub fn new(api_key: impl Into<String>) -> TasksResult<Self> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Replace the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> TasksResult<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(prompt: &PromptPair, options: &GenerateOptions) -> AnthropicRequest {
        AnthropicRequest {
            model: normalize_model(&options.model).to_string(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt.user.clone(),
            }],
            max_tokens: options.max_tokens.unwrap_or(4096),
            system: (!prompt.system.is_empty()).then(|| prompt.system.clone()),
            temperature: options.temperature,
            stream: true,
        }
    }
}

#[async_trait]
impl GeneratorBackend for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(
        &self,
        prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse> {
        let request = Self::build_request(prompt, options);

        tracing::info!("Calling Claude API (streaming) with model {}", request.model);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| classify_transport_error(&e))?;

            return Err(match serde_json::from_str::<AnthropicErrorResponse>(&body) {
                Ok(error_response) => classify_backend_error(
                    Some(status),
                    Some(&error_response.error.error_type),
                    format!(
                        "{} - {}",
                        error_response.error.error_type, error_response.error.message
                    ),
                ),
                Err(_) => classify_backend_error(Some(status), None, format!("({status}) {body}")),
            });
        }

        let mut state = StreamState::default();
        let mut decoder = EventDecoder::default();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| classify_transport_error(&e))?;
            decoder.push(&chunk);

            while let Some(event) = decoder.next_event() {
                state.apply_event(&event)?;
            }
        }

        // Trailing event without a terminating blank line
        state.apply_event(&decoder.finish())?;

        Ok(AIResponse {
            text: state.text,
            usage: TokenUsage::new(state.input_tokens, state.output_tokens),
            model: state.model.unwrap_or_else(|| request.model.clone()),
            provider: "anthropic".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = AnthropicProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn test_model_normalization() {
        assert_eq!(normalize_model("sonnet"), "claude-sonnet-4-20250514");
        assert_eq!(normalize_model("claude-3-opus-20240229"), "claude-3-opus-20240229");
    }

    #[test]
    fn test_request_uses_system_field() {
        let prompt = PromptPair::new("You are a planner", "Break this down");
        let options = GenerateOptions::new("haiku")
            .with_temperature(0.2)
            .with_max_tokens(1000);

        let request = AnthropicProvider::build_request(&prompt, &options);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["system"], "You are a planner");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["model"], "claude-3-5-haiku-20241022");
        assert_eq!(value["max_tokens"], 1000);
        assert_eq!(value["stream"], true);
    }

    #[test]
    fn test_stream_state_accumulates_text() {
        let mut state = StreamState::default();
        state
            .apply(r#"{"type":"message_start","message":{"id":"m","model":"claude-x","usage":{"input_tokens":12}}}"#)
            .unwrap();
        state
            .apply(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"[{\"id\""}}"#)
            .unwrap();
        state
            .apply(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":":1}]"}}"#)
            .unwrap();
        state
            .apply(r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":7}}"#)
            .unwrap();
        state.apply(r#"{"type":"ping"}"#).unwrap();

        assert_eq!(state.text, r#"[{"id":1}]"#);
        assert_eq!(state.model.as_deref(), Some("claude-x"));
        assert_eq!(state.input_tokens, 12);
        assert_eq!(state.output_tokens, 7);
    }

    #[test]
    fn test_stream_error_is_classified() {
        let mut state = StreamState::default();
        let err = state
            .apply(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .unwrap_err();
        assert!(matches!(err, TasksError::QuotaExhausted { .. }));
    }

    #[test]
    fn test_decoder_keeps_split_multibyte_character() {
        let event = "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"café\"}}\n\n";
        let bytes = event.as_bytes();
        let split = event.find('é').unwrap() + 1;

        let mut decoder = EventDecoder::default();
        decoder.push(&bytes[..split]);
        assert!(decoder.next_event().is_none());
        decoder.push(&bytes[split..]);

        let mut state = StreamState::default();
        state.apply_event(&decoder.next_event().unwrap()).unwrap();
        assert_eq!(state.text, "café");
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_decoder_yields_events_in_order() {
        let mut decoder = EventDecoder::default();
        decoder.push(b"event: ping\ndata: {}\n\nevent: message_stop\ndata: {\"type\"");
        assert_eq!(decoder.next_event().as_deref(), Some("event: ping\ndata: {}\n\n"));
        assert!(decoder.next_event().is_none());

        decoder.push(b":\"message_stop\"}");
        assert_eq!(decoder.finish(), "event: message_stop\ndata: {\"type\":\"message_stop\"}");
    }
}
