//! Generation client.
//!
//! Wraps one call to the primary backend with a progress indicator and the
//! error logging every caller relies on.

use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::TasksResult;
use crate::ui::ProgressReporter;

use super::provider::{AIResponse, GenerateOptions, GeneratorBackend, PromptPair};

/// Single-request wrapper around a [`GeneratorBackend`].
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GeneratorBackend>,
    progress: Arc<dyn ProgressReporter>,
    debug: bool,
}

impl GenerationClient {
    pub fn new(
        backend: Arc<dyn GeneratorBackend>,
        progress: Arc<dyn ProgressReporter>,
        debug: bool,
    ) -> Self {
        Self {
            backend,
            progress,
            debug,
        }
    }

    /// Backend provider name.
    pub fn provider(&self) -> &'static str {
        self.backend.name()
    }

    /// Run one completion, showing `label` while it is in flight.
    ///
    /// Classified failures are logged at `error` with their user-facing
    /// message; the vendor detail is logged at `debug` in diagnostic mode.
    pub async fn generate(
        &self,
        label: &str,
        prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse> {
        if self.debug {
            debug!(
                provider = self.backend.name(),
                model = %options.model,
                system_len = prompt.system.len(),
                user_len = prompt.user.len(),
                "Submitting generation request"
            );
        }

        let guard = self.progress.start(label);
        let result = self.backend.complete(prompt, options).await;
        guard.stop();

        match result {
            Ok(response) => {
                if self.debug {
                    debug!(
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "Raw response: {}",
                        response.text
                    );
                }
                Ok(response)
            }
            Err(err) => {
                error!(retryable = err.is_retryable(), "{err}");
                if self.debug {
                    if let Some(detail) = err.detail() {
                        debug!("Backend error detail: {detail}");
                    }
                }
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("provider", &self.backend.name())
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::TokenUsage;
    use crate::errors::TasksError;
    use crate::ui::ProgressGuard;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingReporter {
        started: AtomicUsize,
        stopped: Arc<AtomicUsize>,
    }

    impl ProgressReporter for CountingReporter {
        fn start(&self, _label: &str) -> ProgressGuard {
            self.started.fetch_add(1, Ordering::SeqCst);
            let stopped = Arc::clone(&self.stopped);
            ProgressGuard::new(move || {
                stopped.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    struct FixedBackend(TasksResult<String>);

    #[async_trait]
    impl GeneratorBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn complete(
            &self,
            _prompt: &PromptPair,
            options: &GenerateOptions,
        ) -> TasksResult<AIResponse> {
            self.0.clone().map(|text| AIResponse {
                text,
                usage: TokenUsage::new(3, 4),
                model: options.model.clone(),
                provider: "fixed".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_progress_stopped_on_success_and_failure() {
        let reporter = Arc::new(CountingReporter::default());
        let prompt = PromptPair::new("s", "u");
        let options = GenerateOptions::new("m");

        let ok = GenerationClient::new(
            Arc::new(FixedBackend(Ok("hello".to_string()))),
            reporter.clone(),
            true,
        );
        let response = ok.generate("Generating", &prompt, &options).await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.usage.total_tokens, 7);

        let failing = GenerationClient::new(
            Arc::new(FixedBackend(Err(TasksError::Timeout {
                detail: "read timed out".to_string(),
            }))),
            reporter.clone(),
            false,
        );
        let err = failing.generate("Generating", &prompt, &options).await.unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(reporter.started.load(Ordering::SeqCst), 2);
        assert_eq!(reporter.stopped.load(Ordering::SeqCst), 2);
    }
}
