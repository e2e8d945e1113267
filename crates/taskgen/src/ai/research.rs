//! Research augmentation.
//!
//! Issues one research query per expansion to a secondary, retrieval-backed
//! service. The backend handle is built on first use and reused for the
//! lifetime of the augmenter.

use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info};

use crate::entities::{ModelSettings, Task};
use crate::errors::{TasksError, TasksResult};
use crate::ui::ProgressReporter;

use super::prompts::{PromptManager, ResearchContext};
use super::provider::{GenerateOptions, ResearchBackend};

/// Builds the research backend on first use.
pub type ResearchFactory = Box<dyn Fn() -> TasksResult<Arc<dyn ResearchBackend>> + Send + Sync>;

/// Lazily-connected research client.
pub struct ResearchAugmenter {
    factory: ResearchFactory,
    handle: OnceLock<Arc<dyn ResearchBackend>>,
    settings: ModelSettings,
    prompts: Arc<PromptManager>,
    progress: Arc<dyn ProgressReporter>,
}

impl ResearchAugmenter {
    pub fn new(
        factory: ResearchFactory,
        settings: ModelSettings,
        prompts: Arc<PromptManager>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            factory,
            handle: OnceLock::new(),
            settings,
            prompts,
            progress,
        }
    }

    /// Whether the backend handle has been created.
    pub fn is_connected(&self) -> bool {
        self.handle.get().is_some()
    }

    fn backend(&self) -> TasksResult<Arc<dyn ResearchBackend>> {
        if let Some(backend) = self.handle.get() {
            return Ok(Arc::clone(backend));
        }
        let backend = (self.factory)()?;
        Ok(Arc::clone(self.handle.get_or_init(move || backend)))
    }

    /// Research implementation guidance for `task`.
    ///
    /// Every failure, including a missing credential, is reported as
    /// [`TasksError::ResearchUnavailable`].
    pub async fn research(&self, task: &Task) -> TasksResult<String> {
        self.query(task).await.map_err(|err| {
            error!("Research query failed: {err}");
            if let Some(detail) = err.detail() {
                debug!("Research backend detail: {detail}");
            }
            match err {
                TasksError::ResearchUnavailable { .. } => err,
                other => TasksError::ResearchUnavailable {
                    reason: other.to_string(),
                },
            }
        })
    }

    async fn query(&self, task: &Task) -> TasksResult<String> {
        let backend = self.backend()?;

        let prompt = self.prompts.research_query(&ResearchContext {
            task_title: task.title.clone(),
            task_description: task.description.clone(),
        })?;
        let options = GenerateOptions::new(&self.settings.model_id)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        info!(provider = backend.name(), task_id = task.id, "Researching task");
        let guard = self.progress.start("Researching best practices");
        let result = backend.complete(&prompt, &options).await;
        guard.stop();

        let response = result?;
        if response.text.trim().is_empty() {
            return Err(TasksError::ResearchUnavailable {
                reason: "research backend returned an empty answer".to_string(),
            });
        }
        Ok(response.text)
    }
}

impl std::fmt::Debug for ResearchAugmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchAugmenter")
            .field("model", &self.settings.model_id)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
