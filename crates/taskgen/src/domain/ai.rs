//! AI Domain - retry and recovery orchestration for AI operations.
//!
//! This module provides the entry points the CLI calls:
//! - Break a PRD down into a task collection
//! - Expand a task into subtasks, optionally with research
//! - Analyze task complexity
//!
//! Breakdown and analysis retry and then fail. Expansion never fails on
//! generation problems; it falls back to placeholder subtasks instead.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::ai::extract::{extract_complexity, extract_subtasks, extract_task_collection};
use crate::ai::prompts::{AnalyzeComplexityContext, ExpandTaskContext, ParsePrdContext};
use crate::ai::{
    AIResponse, AnthropicProvider, BreakdownExpectation, GenerateOptions, GenerationClient,
    GeneratorBackend, PerplexityProvider, PromptManager, PromptPair, ResearchAugmenter,
    ResearchBackend, ResearchFactory, TokenUsage,
};
use crate::entities::{
    ComplexityReport, ComplexityReportMeta, ModelSettings, Subtask, Task, TaskCollection,
    TasksConfig,
};
use crate::errors::{TasksError, TasksResult};
use crate::ui::ProgressReporter;

use super::config::Credentials;

/// Score at or above which a task is flagged for expansion.
pub const DEFAULT_COMPLEXITY_THRESHOLD: u8 = 5;

/// Bounded retry budget for breakdown and analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra generation attempts after a retryable backend failure
    pub max_generation_retries: u32,
    /// Extra extraction attempts; the first reuses the same text, later
    /// ones regenerate
    pub max_extraction_retries: u32,
    /// Linear backoff unit: attempt `n` waits `n * backoff_step`
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// Same attempt budget with no waiting.
    pub fn immediate() -> Self {
        Self {
            backoff_step: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_generation_retries: 2,
            max_extraction_retries: 2,
            backoff_step: Duration::from_secs(5),
        }
    }
}

/// AI Domain for AI-powered task operations.
pub struct AIDomain {
    client: GenerationClient,
    research: ResearchAugmenter,
    prompts: Arc<PromptManager>,
    config: TasksConfig,
    retry: RetryPolicy,
}

impl AIDomain {
    /// Build the production backends from configuration and credentials.
    ///
    /// A missing primary credential fails here; a missing research
    /// credential only fails once research is requested.
    pub fn from_config(
        config: TasksConfig,
        credentials: &Credentials,
        progress: Arc<dyn ProgressReporter>,
    ) -> TasksResult<Self> {
        let mut generator = AnthropicProvider::new(credentials.require_primary()?)?;
        if let Some(url) = &config.models.main.base_url {
            generator = generator.with_base_url(url);
        }

        let research_credentials = credentials.clone();
        let research_url = config.models.research.base_url.clone();
        let factory: ResearchFactory = Box::new(move || {
            let mut provider = PerplexityProvider::new(research_credentials.require_research()?)?;
            if let Some(url) = &research_url {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider) as Arc<dyn ResearchBackend>)
        });

        Ok(Self::with_backends(config, Arc::new(generator), factory, progress))
    }

    /// Create with explicit backends.
    pub fn with_backends(
        config: TasksConfig,
        generator: Arc<dyn GeneratorBackend>,
        research: ResearchFactory,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        let prompts = Arc::new(PromptManager::new());
        Self {
            client: GenerationClient::new(generator, Arc::clone(&progress), config.global.debug),
            research: ResearchAugmenter::new(
                research,
                config.models.research.clone(),
                Arc::clone(&prompts),
                progress,
            ),
            prompts,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Effective configuration.
    pub fn config(&self) -> &TasksConfig {
        &self.config
    }

    fn main_options(&self) -> GenerateOptions {
        options_for(&self.config.models.main)
    }

    fn today() -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }

    /// Break a PRD down into exactly `num_tasks` tasks (a short or long
    /// response is kept with a warning).
    pub async fn breakdown_prd(
        &self,
        prd_text: &str,
        prd_path: &str,
        num_tasks: u32,
    ) -> TasksResult<(TaskCollection, TokenUsage)> {
        if num_tasks == 0 {
            return Err(TasksError::InvalidArgument {
                reason: "number of tasks must be positive".to_string(),
            });
        }
        if prd_text.trim().is_empty() {
            return Err(TasksError::InvalidArgument {
                reason: format!("PRD '{prd_path}' is empty"),
            });
        }

        let expectation = BreakdownExpectation {
            num_tasks,
            source_file: prd_path.to_string(),
            project_name: self.config.global.project_name.clone().unwrap_or_else(|| {
                Path::new(prd_path)
                    .file_stem()
                    .map_or_else(|| "PRD Implementation".to_string(), |s| s.to_string_lossy().into_owned())
            }),
            generated_at: Self::today(),
        };

        let prompt = self
            .prompts
            .parse_prd(&ParsePrdContext::new(prd_text, prd_path, num_tasks))?;

        info!(num_tasks, prd_path, "Breaking down PRD");
        let (collection, usage) = self
            .generate_and_extract("Generating tasks from PRD", &prompt, |text| {
                extract_task_collection(text, &expectation)
            })
            .await?;

        info!(
            tasks = collection.tasks.len(),
            total_tokens = usage.total_tokens,
            "PRD breakdown complete"
        );
        Ok((collection, usage))
    }

    /// Expand `task` into exactly `num_subtasks` subtasks numbered from
    /// `next_subtask_id`.
    ///
    /// Never fails: generation or extraction problems yield placeholder
    /// subtasks.
    pub async fn expand_task(
        &self,
        task: &Task,
        num_subtasks: u32,
        next_subtask_id: u32,
        additional_context: &str,
    ) -> Vec<Subtask> {
        self.expand(task, num_subtasks, next_subtask_id, additional_context, None)
            .await
    }

    /// Research `task` first, then expand it with the findings.
    ///
    /// Fails only when research is unavailable.
    pub async fn expand_task_with_research(
        &self,
        task: &Task,
        num_subtasks: u32,
        next_subtask_id: u32,
        additional_context: &str,
    ) -> TasksResult<Vec<Subtask>> {
        let findings = self.research.research(task).await?;
        Ok(self
            .expand(
                task,
                num_subtasks,
                next_subtask_id,
                additional_context,
                Some(findings),
            )
            .await)
    }

    async fn expand(
        &self,
        task: &Task,
        num_subtasks: u32,
        next_subtask_id: u32,
        additional_context: &str,
        research: Option<String>,
    ) -> Vec<Subtask> {
        if num_subtasks == 0 {
            warn!(task_id = task.id, "Asked for zero subtasks; nothing to expand");
            return Vec::new();
        }

        info!(
            task_id = task.id,
            num_subtasks,
            with_research = research.is_some(),
            "Expanding task"
        );

        match self
            .try_expand(task, num_subtasks, next_subtask_id, additional_context, research)
            .await
        {
            Ok(subtasks) => fit_to_count(subtasks, task.id, num_subtasks, next_subtask_id),
            Err(err) => {
                warn!(
                    task_id = task.id,
                    "Subtask generation failed ({err}); using {num_subtasks} placeholder subtasks"
                );
                fallback_subtasks(task.id, num_subtasks, next_subtask_id)
            }
        }
    }

    async fn try_expand(
        &self,
        task: &Task,
        num_subtasks: u32,
        next_subtask_id: u32,
        additional_context: &str,
        research: Option<String>,
    ) -> TasksResult<Vec<Subtask>> {
        let mut context = ExpandTaskContext::new(task, num_subtasks, next_subtask_id)
            .with_additional_context(additional_context);
        if let Some(findings) = research {
            context = context.with_research(findings);
        }
        let prompt = self.prompts.expand_task(&context)?;

        let response = self
            .client
            .generate("Generating subtasks", &prompt, &self.main_options())
            .await?;
        extract_subtasks(&response.text, task.id, next_subtask_id)
    }

    /// Score each task's complexity and recommend an expansion size.
    pub async fn analyze_complexity(
        &self,
        tasks: &[Task],
    ) -> TasksResult<(ComplexityReport, TokenUsage)> {
        self.analyze(tasks, false).await
    }

    /// Like [`Self::analyze_complexity`], asking the model to weigh current
    /// best practices. The report records that research mode was used.
    pub async fn analyze_complexity_with_research(
        &self,
        tasks: &[Task],
    ) -> TasksResult<(ComplexityReport, TokenUsage)> {
        self.analyze(tasks, true).await
    }

    async fn analyze(
        &self,
        tasks: &[Task],
        use_research: bool,
    ) -> TasksResult<(ComplexityReport, TokenUsage)> {
        if tasks.is_empty() {
            return Err(TasksError::InvalidArgument {
                reason: "no tasks to analyze".to_string(),
            });
        }

        let context =
            AnalyzeComplexityContext::new(tasks, self.config.global.recommended_subtask_range())?
                .with_research(use_research);
        let prompt = self.prompts.analyze_complexity(&context)?;

        info!(tasks = tasks.len(), "Analyzing task complexity");
        let (entries, usage) = self
            .generate_and_extract("Analyzing task complexity", &prompt, |text| {
                extract_complexity(text, tasks.len())
            })
            .await?;

        let missing: Vec<u32> = tasks
            .iter()
            .map(|t| t.id)
            .filter(|id| !entries.iter().any(|e| e.task_id == *id))
            .collect();
        if !missing.is_empty() {
            warn!("No complexity analysis returned for tasks {missing:?}");
        }
        for entry in &entries {
            if !tasks.iter().any(|t| t.id == entry.task_id) {
                warn!("Complexity analysis references unknown task {}", entry.task_id);
            }
        }

        let report = ComplexityReport {
            meta: ComplexityReportMeta {
                generated_at: Self::today(),
                tasks_analyzed: tasks.len(),
                threshold_score: DEFAULT_COMPLEXITY_THRESHOLD,
                project_name: self.config.global.project_name.clone(),
                used_research: context.use_research,
            },
            complexity_analysis: entries,
        };
        Ok((report, usage))
    }

    /// Generate with bounded retries on retryable backend failures.
    async fn generate_with_retry(
        &self,
        label: &str,
        prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse> {
        let mut attempt = 0;
        loop {
            match self.client.generate(label, prompt, options).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.retry.max_generation_retries => {
                    attempt += 1;
                    let wait = self.retry.backoff(attempt);
                    warn!(
                        "Retrying generation in {}s (attempt {attempt}/{})",
                        wait.as_secs(),
                        self.retry.max_generation_retries
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Generate, then extract with bounded extraction retries.
    async fn generate_and_extract<T>(
        &self,
        label: &str,
        prompt: &PromptPair,
        extract: impl Fn(&str) -> TasksResult<T>,
    ) -> TasksResult<(T, TokenUsage)> {
        let options = self.main_options();
        let mut usage = TokenUsage::default();

        let mut response = self.generate_with_retry(label, prompt, &options).await?;
        usage.add(response.usage);

        let mut retries = 0;
        loop {
            match extract(&response.text) {
                Ok(value) => return Ok((value, usage)),
                Err(err) if retries < self.retry.max_extraction_retries => {
                    retries += 1;
                    if retries == 1 {
                        warn!("{err}; retrying extraction on the same response");
                    } else {
                        warn!("{err}; regenerating (attempt {retries}/{})", self.retry.max_extraction_retries);
                        response = self.generate_with_retry(label, prompt, &options).await?;
                        usage.add(response.usage);
                    }
                }
                Err(err) => {
                    error!("Giving up after {retries} extraction retries: {err}");
                    return Err(err);
                }
            }
        }
    }
}

impl std::fmt::Debug for AIDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AIDomain")
            .field("client", &self.client)
            .field("research", &self.research)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn options_for(settings: &ModelSettings) -> GenerateOptions {
    GenerateOptions::new(&settings.model_id)
        .with_temperature(settings.temperature)
        .with_max_tokens(settings.max_tokens)
}

/// Placeholder subtasks numbered from `next_subtask_id`.
pub fn fallback_subtasks(parent_task_id: u32, count: u32, next_subtask_id: u32) -> Vec<Subtask> {
    (next_subtask_id..next_subtask_id.saturating_add(count))
        .map(|id| Subtask::fallback(id, parent_task_id))
        .collect()
}

/// Truncate or pad a successful expansion to exactly `count` records.
fn fit_to_count(
    mut subtasks: Vec<Subtask>,
    parent_task_id: u32,
    count: u32,
    next_subtask_id: u32,
) -> Vec<Subtask> {
    let wanted = count as usize;
    let end = next_subtask_id.saturating_add(count);

    if subtasks.len() > wanted {
        warn!(
            "Model returned {} subtasks for task {parent_task_id}; keeping the first {count}",
            subtasks.len()
        );
        subtasks.truncate(wanted);
        for subtask in &mut subtasks {
            subtask.dependencies.retain(|dep| *dep < end);
        }
    } else if subtasks.len() < wanted {
        warn!(
            "Model returned {} subtasks for task {parent_task_id}; padding to {count}",
            subtasks.len()
        );
        let first_missing =
            next_subtask_id.saturating_add(u32::try_from(subtasks.len()).unwrap_or(count));
        subtasks.extend((first_missing..end).map(|id| Subtask::fallback(id, parent_task_id)));
    }

    subtasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(5));
        assert_eq!(policy.backoff(2), Duration::from_secs(10));
        assert_eq!(RetryPolicy::immediate().backoff(2), Duration::ZERO);
        assert_eq!(RetryPolicy::immediate().max_extraction_retries, 2);
    }

    #[test]
    fn test_fallback_subtasks_sequence() {
        let subtasks = fallback_subtasks(4, 3, 6);
        let ids: Vec<u32> = subtasks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![6, 7, 8]);
        assert!(subtasks.iter().all(|s| s.parent_task_id == 4));
        assert_eq!(subtasks[0].title, "Subtask 6");
    }

    #[test]
    fn test_fit_to_count_pads_and_truncates() {
        let two = vec![Subtask::new(1, 2, "a", "a"), Subtask::new(2, 2, "b", "b")];

        let padded = fit_to_count(two.clone(), 2, 4, 1);
        let ids: Vec<u32> = padded.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(padded[2].title, "Subtask 3");

        let mut long = two;
        long[0].dependencies = vec![2];
        let truncated = fit_to_count(long, 2, 1, 1);
        assert_eq!(truncated.len(), 1);
        assert!(truncated[0].dependencies.is_empty());
    }

    #[test]
    fn test_subtask_ids_near_the_top_of_the_range() {
        let fallback = fallback_subtasks(1, 3, u32::MAX - 1);
        let ids: Vec<u32> = fallback.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![u32::MAX - 1]);

        let padded = fit_to_count(Vec::new(), 1, 5, u32::MAX);
        assert!(padded.is_empty());
    }
}
