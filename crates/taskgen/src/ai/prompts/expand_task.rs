//! Expand task prompt template.
//!
//! Breaks down a task into a bare JSON array of subtasks.

use serde::Serialize;

use crate::entities::Task;

use super::PromptTemplate;

/// Context for expand-task prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ExpandTaskContext {
    /// Number of subtasks to generate
    pub subtask_count: u32,
    /// The task to expand
    pub task: TaskSummary,
    /// Starting ID for new subtasks
    pub next_subtask_id: u32,
    /// Last ID in the requested range
    pub last_subtask_id: u32,
    /// Caller-supplied extra context
    pub additional_context: String,
    /// Research findings to ground the breakdown
    pub research_context: String,
}

impl ExpandTaskContext {
    pub fn new(task: &Task, subtask_count: u32, next_subtask_id: u32) -> Self {
        Self {
            subtask_count,
            task: TaskSummary::from(task),
            next_subtask_id,
            last_subtask_id: next_subtask_id.saturating_add(subtask_count.saturating_sub(1)),
            additional_context: String::new(),
            research_context: String::new(),
        }
    }

    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = context.into();
        self
    }

    pub fn with_research(mut self, research: impl Into<String>) -> Self {
        self.research_context = research.into();
        self
    }
}

/// Simplified task representation for prompts.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub details: String,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            details: task.details.clone(),
        }
    }
}

/// Get the expand-task template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new(super::EXPAND_TASK, SYSTEM_PROMPT, USER_PROMPT)
        .with_description("Break down a task into detailed subtasks")
}

const SYSTEM_PROMPT: &str = r#"You are an AI assistant helping with task breakdown for software development.
You need to break down a high-level task into exactly {{subtask_count}} specific subtasks that can be implemented one by one.{{#if research_context}}

Use the research findings provided by the user to ground each subtask in current best practices, libraries and tools.{{/if}}

Subtasks should:
1. Be specific and actionable implementation steps
2. Follow a logical sequence
3. Each handle a distinct part of the parent task
4. Include clear guidance on implementation approach
5. Have appropriate dependency chains between subtasks

For each subtask, provide:
- id: sequential integers starting EXACTLY from {{next_subtask_id}} and ending at {{last_subtask_id}}
- title: a clear, specific title
- description: a detailed description
- dependencies: an array of IDs of earlier subtasks in this list it depends on (can be empty [])
- details: implementation details

Your response MUST be a bare JSON array of exactly {{subtask_count}} subtask objects, with no wrapping object:
[
  {
    "id": {{next_subtask_id}},
    "title": "First subtask title",
    "description": "Detailed description",
    "dependencies": [],
    "details": "Implementation details"
  }
]

Return only the JSON array, with no additional explanation or comments."#;

const USER_PROMPT: &str = r"Please break down this task into exactly {{subtask_count}} specific, actionable subtasks:

Task ID: {{task.id}}
Title: {{task.title}}
Description: {{task.description}}
Current details: {{#if task.details}}{{task.details}}{{else}}None provided{{/if}}{{#if additional_context}}

Additional context: {{additional_context}}{{/if}}{{#if research_context}}

Research findings:
{{research_context}}{{/if}}

Return exactly {{subtask_count}} subtasks with IDs {{next_subtask_id}} through {{last_subtask_id}}.";
