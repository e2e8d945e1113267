//! Integration tests for the retry and recovery orchestration.
//!
//! Backends are scripted in memory so every failure path can be driven
//! deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use taskgen::ai::{
    AIResponse, GenerateOptions, GeneratorBackend, PromptPair, ResearchBackend, ResearchFactory,
    TokenUsage,
};
use taskgen::domain::{AIDomain, Credentials, RetryPolicy};
use taskgen::entities::{Task, TaskStatus, TasksConfig};
use taskgen::errors::{TasksError, TasksResult};
use taskgen::ui::SilentReporter;

/// Generator that replays a script, repeating the last entry once exhausted.
struct ScriptedGenerator {
    script: Mutex<VecDeque<TasksResult<String>>>,
    last: Mutex<Option<TasksResult<String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<PromptPair>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<TasksResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn always(result: TasksResult<String>) -> Arc<Self> {
        Self::new(vec![result])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> PromptPair {
        self.prompts.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl GeneratorBackend for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(
        &self,
        prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());

        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(result) => {
                *self.last.lock().unwrap() = Some(result.clone());
                result
            }
            None => self.last.lock().unwrap().clone().unwrap(),
        };

        result.map(|text| AIResponse {
            text,
            usage: TokenUsage::new(10, 20),
            model: options.model.clone(),
            provider: "scripted".to_string(),
        })
    }
}

struct StaticResearch(&'static str);

#[async_trait]
impl ResearchBackend for StaticResearch {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn complete(
        &self,
        _prompt: &PromptPair,
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse> {
        Ok(AIResponse {
            text: self.0.to_string(),
            usage: TokenUsage::default(),
            model: options.model.clone(),
            provider: "static".to_string(),
        })
    }
}

fn no_research() -> ResearchFactory {
    Box::new(|| {
        Err(TasksError::CredentialMissing {
            backend: "perplexity".to_string(),
            env_var: "PERPLEXITY_API_KEY".to_string(),
        })
    })
}

fn domain(generator: Arc<ScriptedGenerator>, research: ResearchFactory) -> AIDomain {
    AIDomain::with_backends(
        TasksConfig::default(),
        generator,
        research,
        Arc::new(SilentReporter),
    )
    .with_retry_policy(RetryPolicy::immediate())
}

fn timeout() -> TasksError {
    TasksError::Timeout {
        detail: "deadline exceeded".to_string(),
    }
}

const TWO_TASKS: &str = r#"Here is the plan:
```json
{"tasks": [
  {"id": 1, "title": "Setup", "description": "Init repo", "priority": "high"},
  {"id": 2, "title": "API", "description": "Routes", "dependencies": ["1"]}
]}
```"#;

mod breakdown_tests {
    use super::*;

    #[tokio::test]
    async fn test_breakdown_success_synthesizes_metadata() {
        let generator = ScriptedGenerator::always(Ok(TWO_TASKS.to_string()));
        let ai = domain(generator.clone(), no_research());

        let (collection, usage) = ai
            .breakdown_prd("# Todo app", "docs/todo.txt", 2)
            .await
            .unwrap();

        assert_eq!(generator.calls(), 1);
        assert!(generator.last_prompt().system.contains("exactly 2"));
        assert!(generator.last_prompt().user.contains("# Todo app"));

        let ids: Vec<u32> = collection.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(collection.tasks[1].dependencies, vec![1]);
        assert!(collection.tasks.iter().all(|t| t.status == TaskStatus::Pending));
        assert_eq!(collection.metadata.total_tasks, 2);
        assert_eq!(collection.metadata.project_name, "todo");
        assert_eq!(collection.metadata.source_file, "docs/todo.txt");
        assert_eq!(collection.metadata.generated_at.len(), 10);
        assert_eq!(usage.total_tokens, 30);
    }

    #[tokio::test]
    async fn test_garbage_output_exhausts_extraction_retries() {
        let generator = ScriptedGenerator::new(vec![
            Ok("I cannot help with that.".to_string()),
            Ok("Still no JSON here.".to_string()),
            Ok(TWO_TASKS.to_string()),
        ]);
        let ai = domain(generator.clone(), no_research());

        let err = ai.breakdown_prd("# PRD", "prd.txt", 2).await.unwrap_err();

        assert!(matches!(err, TasksError::ExtractionFailed { .. }));
        // One same-text retry, then one regeneration
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_regeneration_recovers_from_bad_output() {
        let generator = ScriptedGenerator::new(vec![
            Ok("{ \"tasks\": [ truncated".to_string()),
            Ok(TWO_TASKS.to_string()),
        ]);
        let ai = domain(generator.clone(), no_research());

        let (collection, usage) = ai.breakdown_prd("# PRD", "prd.txt", 2).await.unwrap();

        assert_eq!(collection.tasks.len(), 2);
        assert_eq!(generator.calls(), 2);
        assert_eq!(usage.total_tokens, 60);
    }

    #[tokio::test]
    async fn test_retryable_errors_retried_twice() {
        let generator =
            ScriptedGenerator::new(vec![Err(timeout()), Err(timeout()), Ok(TWO_TASKS.to_string())]);
        let ai = domain(generator.clone(), no_research());

        assert!(ai.breakdown_prd("# PRD", "prd.txt", 2).await.is_ok());
        assert_eq!(generator.calls(), 3);

        let generator = ScriptedGenerator::always(Err(TasksError::QuotaExhausted {
            detail: "rate_limit_error".to_string(),
        }));
        let ai = domain(generator.clone(), no_research());

        let err = ai.breakdown_prd("# PRD", "prd.txt", 2).await.unwrap_err();
        assert!(matches!(err, TasksError::QuotaExhausted { .. }));
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_fatal_errors_are_not_retried() {
        let generator = ScriptedGenerator::always(Err(TasksError::PermissionDenied {
            detail: "invalid x-api-key".to_string(),
        }));
        let ai = domain(generator.clone(), no_research());

        let err = ai.breakdown_prd("# PRD", "prd.txt", 2).await.unwrap_err();

        assert!(matches!(err, TasksError::PermissionDenied { .. }));
        assert!(!err.to_string().contains("x-api-key"));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_count_mismatch_keeps_all_tasks() {
        let generator = ScriptedGenerator::always(Ok(TWO_TASKS.to_string()));
        let ai = domain(generator, no_research());

        let (collection, _) = ai.breakdown_prd("# PRD", "prd.txt", 5).await.unwrap();
        assert_eq!(collection.tasks.len(), 2);
        assert_eq!(collection.metadata.total_tasks, 2);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let generator = ScriptedGenerator::always(Ok(TWO_TASKS.to_string()));
        let ai = domain(generator.clone(), no_research());

        assert!(matches!(
            ai.breakdown_prd("# PRD", "prd.txt", 0).await,
            Err(TasksError::InvalidArgument { .. })
        ));
        assert!(ai.breakdown_prd("   ", "prd.txt", 3).await.is_err());
        assert_eq!(generator.calls(), 0);
    }
}

mod expand_tests {
    use super::*;

    fn parent() -> Task {
        Task::new(7, "Payments", "Integrate Stripe checkout")
    }

    #[tokio::test]
    async fn test_expand_renumbers_from_offset() {
        let generator = ScriptedGenerator::always(Ok(r#"Sure:
[{"id": 1, "title": "Client", "description": "SDK client"},
 {"id": 2, "title": "Webhook", "description": "Verify signatures", "dependencies": ["1", "4"]}]"#
            .to_string()));
        let ai = domain(generator.clone(), no_research());

        let subtasks = ai.expand_task(&parent(), 2, 4, "Use test mode keys").await;

        let ids: Vec<u32> = subtasks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert!(subtasks.iter().all(|s| s.parent_task_id == 7));
        assert_eq!(subtasks[1].dependencies, vec![4]);
        let prompt = generator.last_prompt();
        assert!(prompt.user.contains("Additional context: Use test mode keys"));
        assert!(prompt.system.contains("starting EXACTLY from 4"));
    }

    #[tokio::test]
    async fn test_offset_at_top_of_id_range_does_not_panic() {
        let generator = ScriptedGenerator::always(Err(timeout()));
        let ai = domain(generator, no_research());

        let subtasks = ai.expand_task(&parent(), 3, u32::MAX - 2, "").await;

        let ids: Vec<u32> = subtasks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![u32::MAX - 2, u32::MAX - 1]);
    }

    #[tokio::test]
    async fn test_timeouts_fall_back_to_placeholders() {
        let generator = ScriptedGenerator::always(Err(timeout()));
        let ai = domain(generator.clone(), no_research());

        let subtasks = ai.expand_task(&parent(), 3, 1, "").await;

        assert_eq!(subtasks.len(), 3);
        for (subtask, id) in subtasks.iter().zip(1..) {
            assert_eq!(subtask.id, id);
            assert_eq!(subtask.title, format!("Subtask {id}"));
            assert!(subtask.details.contains("auto-generated"));
            assert!(subtask.dependencies.is_empty());
            assert_eq!(subtask.status, TaskStatus::Pending);
            assert_eq!(subtask.parent_task_id, 7);
        }
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_output_falls_back() {
        let generator = ScriptedGenerator::always(Ok("[]".to_string()));
        let ai = domain(generator, no_research());

        let subtasks = ai.expand_task(&parent(), 2, 9, "").await;
        let ids: Vec<u32> = subtasks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![9, 10]);
        assert_eq!(subtasks[0].title, "Subtask 9");
    }

    #[tokio::test]
    async fn test_short_expansion_is_padded() {
        let generator = ScriptedGenerator::always(Ok(
            r#"[{"title": "Only one", "description": "d"}]"#.to_string(),
        ));
        let ai = domain(generator, no_research());

        let subtasks = ai.expand_task(&parent(), 3, 1, "").await;
        assert_eq!(subtasks.len(), 3);
        assert_eq!(subtasks[0].title, "Only one");
        assert_eq!(subtasks[2].title, "Subtask 3");
    }

    #[tokio::test]
    async fn test_research_unavailable_is_fatal() {
        let generator = ScriptedGenerator::always(Err(timeout()));
        let ai = domain(generator.clone(), no_research());

        let err = ai
            .expand_task_with_research(&parent(), 3, 1, "")
            .await
            .unwrap_err();

        assert!(matches!(err, TasksError::ResearchUnavailable { .. }));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_research_findings_reach_the_prompt() {
        let generator = ScriptedGenerator::always(Ok(
            r#"[{"title": "Checkout session", "description": "d"}]"#.to_string(),
        ));
        let research: ResearchFactory = Box::new(|| {
            Ok(Arc::new(StaticResearch("Use stripe-rust with idempotency keys"))
                as Arc<dyn ResearchBackend>)
        });
        let ai = domain(generator.clone(), research);

        let subtasks = ai
            .expand_task_with_research(&parent(), 1, 1, "")
            .await
            .unwrap();

        assert_eq!(subtasks.len(), 1);
        assert!(generator
            .last_prompt()
            .user
            .contains("Research findings:\nUse stripe-rust with idempotency keys"));
    }

    #[tokio::test]
    async fn test_research_then_generation_failure_still_falls_back() {
        let generator = ScriptedGenerator::always(Err(TasksError::InvalidRequest {
            detail: "max_tokens too large".to_string(),
        }));
        let research: ResearchFactory =
            Box::new(|| Ok(Arc::new(StaticResearch("notes")) as Arc<dyn ResearchBackend>));
        let ai = domain(generator, research);

        let subtasks = ai
            .expand_task_with_research(&parent(), 2, 3, "")
            .await
            .unwrap();
        assert_eq!(subtasks[1].title, "Subtask 4");
    }
}

mod complexity_tests {
    use super::*;

    fn entry(id: u32) -> String {
        format!(
            r#"{{"taskId": {id}, "taskTitle": "Task {id}", "complexityScore": {score},
               "recommendedSubtasks": 4, "expansionPrompt": "Split it", "reasoning": "Because"}}"#,
            score = id + 2
        )
    }

    fn tasks(n: u32) -> Vec<Task> {
        (1..=n)
            .map(|id| Task::new(id, format!("Task {id}"), "desc"))
            .collect()
    }

    #[tokio::test]
    async fn test_short_response_is_not_padded() {
        let body = format!("[{}]", (1..=4).map(entry).collect::<Vec<_>>().join(","));
        let generator = ScriptedGenerator::always(Ok(body));
        let ai = domain(generator.clone(), no_research());

        let (report, _) = ai.analyze_complexity(&tasks(5)).await.unwrap();

        assert_eq!(report.complexity_analysis.len(), 4);
        assert_eq!(report.meta.tasks_analyzed, 5);
        assert_eq!(report.complexity_analysis[3].complexity_score, 6);
        assert!(report.get_task_analysis(5).is_none());
        assert!(generator.last_prompt().system.contains("between 4 and 7"));
        assert!(!report.meta.used_research);
    }

    #[tokio::test]
    async fn test_research_mode_is_recorded() {
        let body = format!("[{},{}]", entry(1), entry(2));
        let generator = ScriptedGenerator::always(Ok(body));
        let ai = domain(generator.clone(), no_research());

        let (report, _) = ai.analyze_complexity_with_research(&tasks(2)).await.unwrap();

        assert!(report.meta.used_research);
        assert!(generator.last_prompt().user.contains("best practices"));
    }

    #[tokio::test]
    async fn test_analysis_failure_is_fatal() {
        let generator = ScriptedGenerator::always(Ok("no analysis".to_string()));
        let ai = domain(generator.clone(), no_research());

        let err = ai.analyze_complexity(&tasks(2)).await.unwrap_err();
        assert!(matches!(err, TasksError::ExtractionFailed { .. }));
        assert_eq!(generator.calls(), 2);
    }
}

mod construction_tests {
    use super::*;

    #[test]
    fn test_missing_primary_credential_is_fatal() {
        let err = AIDomain::from_config(
            TasksConfig::default(),
            &Credentials::default(),
            Arc::new(SilentReporter),
        )
        .unwrap_err();

        assert!(matches!(err, TasksError::CredentialMissing { ref env_var, .. } if env_var == "ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn test_missing_research_credential_only_fails_research() {
        let credentials = Credentials {
            primary: Some("sk-ant-test".to_string()),
            research: None,
        };
        let ai = AIDomain::from_config(
            TasksConfig::default(),
            &credentials,
            Arc::new(SilentReporter),
        )
        .unwrap();

        let err = ai
            .expand_task_with_research(&Task::new(1, "a", "b"), 2, 1, "")
            .await
            .unwrap_err();
        assert!(matches!(err, TasksError::ResearchUnavailable { ref reason } if reason.contains("PERPLEXITY_API_KEY")));
    }
}
