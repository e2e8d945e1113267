//! Analyze complexity prompt template.
//!
//! Scores task complexity and recommends an expansion size per task.

use serde::Serialize;

use crate::entities::Task;
use crate::errors::TasksResult;

use super::PromptTemplate;

/// Context for analyze-complexity prompt.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeComplexityContext {
    /// Tasks to analyze (as JSON)
    pub tasks: serde_json::Value,
    /// Number of tasks in `tasks`
    pub task_count: usize,
    /// Lower bound for recommended subtasks
    pub min_subtasks: u32,
    /// Upper bound for recommended subtasks
    pub max_subtasks: u32,
    /// Ask for research-informed analysis
    pub use_research: bool,
}

impl AnalyzeComplexityContext {
    pub fn new(tasks: &[Task], subtask_range: (u32, u32)) -> TasksResult<Self> {
        Ok(Self {
            tasks: serde_json::to_value(tasks)?,
            task_count: tasks.len(),
            min_subtasks: subtask_range.0,
            max_subtasks: subtask_range.1,
            use_research: false,
        })
    }

    pub fn with_research(mut self, use_research: bool) -> Self {
        self.use_research = use_research;
        self
    }
}

/// Get the analyze-complexity template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new(super::ANALYZE_COMPLEXITY, SYSTEM_PROMPT, USER_PROMPT)
        .with_description("Analyze task complexity and generate expansion recommendations")
}

const SYSTEM_PROMPT: &str = r#"You are an expert software architect and project manager analyzing task complexity. Your analysis should consider implementation effort, technical challenges, dependencies, and testing requirements.

For each task, provide an analysis object with ALL of the following fields:
- taskId: The ID of the task being analyzed
- taskTitle: The title of the task
- complexityScore: A score from 1-10 indicating complexity
- recommendedSubtasks: Number of subtasks recommended, between {{min_subtasks}} and {{max_subtasks}}
- expansionPrompt: A prompt to guide subtask generation
- reasoning: Your reasoning for the complexity score

Your response MUST be a JSON array containing exactly one analysis object per input task ({{task_count}} in total). Do not omit any task. Return only the JSON array, with no additional explanation or comments."#;

const USER_PROMPT: &str = r"Analyze the following {{task_count}} tasks to determine their complexity (1-10 scale) and recommend the number of subtasks for expansion. Provide a brief reasoning and an initial expansion prompt for each.{{#if use_research}} Consider current best practices, common implementation patterns, and industry standards in your analysis.{{/if}}

Tasks:
{{{json tasks}}}";
