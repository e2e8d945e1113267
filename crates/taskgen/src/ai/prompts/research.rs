//! Research query prompt template.

use serde::Serialize;

use super::PromptTemplate;

/// Context for research-query prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchContext {
    pub task_title: String,
    pub task_description: String,
}

/// Get the research-query template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new(super::RESEARCH_QUERY, SYSTEM_PROMPT, USER_PROMPT)
        .with_description("Research implementation guidance for a task")
}

const SYSTEM_PROMPT: &str = "You are a senior software engineer researching how to implement a development task. Answer with concise, current, concrete guidance: recommended libraries and versions, key APIs, common pitfalls, and testing approaches.";

const USER_PROMPT: &str = r"What are the current best practices, recommended libraries, and implementation approaches for the following software development task?

Task: {{task_title}}
Description: {{task_description}}

Include specific technical details, code patterns where useful, and potential pitfalls to avoid.";
