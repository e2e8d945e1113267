//! Parse PRD prompt template.
//!
//! Generates tasks from a Product Requirements Document.

use serde::Serialize;

use super::PromptTemplate;

/// Context for parse-prd prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ParsePrdContext {
    /// Exact number of tasks to generate
    pub num_tasks: u32,
    /// Content of the PRD file
    pub prd_content: String,
    /// Path to the PRD file
    pub prd_path: String,
    /// Default priority for tasks
    pub default_task_priority: String,
}

impl ParsePrdContext {
    pub fn new(prd_content: impl Into<String>, prd_path: impl Into<String>, num_tasks: u32) -> Self {
        Self {
            num_tasks,
            prd_content: prd_content.into(),
            prd_path: prd_path.into(),
            default_task_priority: "medium".to_string(),
        }
    }
}

/// Get the parse-prd template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new(super::PARSE_PRD, SYSTEM_PROMPT, USER_PROMPT)
        .with_description("Parse a Product Requirements Document into structured tasks")
}

const SYSTEM_PROMPT: &str = r#"You are an AI assistant helping to break down a Product Requirements Document (PRD) into a set of sequential development tasks.
Your goal is to create exactly {{num_tasks}} well-structured, actionable development tasks based on the PRD provided.

Each task should follow this JSON structure:
{
  "id": number,
  "title": string,
  "description": string,
  "status": "pending",
  "dependencies": number[] (IDs of tasks this depends on),
  "priority": "high" | "medium" | "low",
  "details": string (implementation details),
  "testStrategy": string (validation approach)
}

Guidelines:
1. Create exactly {{num_tasks}} tasks, numbered sequentially from 1 to {{num_tasks}}
2. Each task should be atomic and focused on a single responsibility
3. Order tasks logically: setup and core functionality first, then advanced features
4. Early tasks should have no dependencies
5. A task may only depend on tasks with lower or equal IDs that are already defined; never reference a later task or the task itself
6. Assign priority (high/medium/low) based on criticality and dependency order; default to "{{default_task_priority}}"
7. Include detailed implementation guidance in the "details" field
8. Include a clear validation approach in the "testStrategy" field
9. If the PRD names specific libraries, schemas, frameworks or tech stacks, adhere to them strictly

Expected output format:
{
  "tasks": [
    {
      "id": 1,
      "title": "Setup Project Repository",
      "description": "...",
      "status": "pending",
      "dependencies": [],
      "priority": "high",
      "details": "...",
      "testStrategy": "..."
    }
  ],
  "metadata": {
    "projectName": "PRD Implementation",
    "totalTasks": {{num_tasks}},
    "sourceFile": "{{prd_path}}",
    "generatedAt": "YYYY-MM-DD"
  }
}

Important: Your response must be valid JSON only, with no additional explanation or comments."#;

const USER_PROMPT: &str = r"Here's the Product Requirements Document (PRD) to break down into exactly {{num_tasks}} tasks:

{{prd_content}}

Return your response in the JSON format specified above.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prd_render() {
        let context = ParsePrdContext::new("# Todo app\n\nUsers can add {items}.", "docs/prd.txt", 7);
        let rendered = template().render(&context).unwrap();

        assert!(rendered.system.contains("exactly 7"));
        assert!(rendered.system.contains("\"testStrategy\""));
        assert!(rendered.system.contains("lower or equal IDs"));
        assert!(rendered.system.contains("docs/prd.txt"));
        assert!(rendered.user.contains("# Todo app\n\nUsers can add {items}."));
    }
}
