//! Response extraction and normalization.
//!
//! Locates the JSON payload inside free-form model output, checks its shape
//! and normalizes it into domain entities. Every failure is reported as
//! [`TasksError::ExtractionFailed`]. Extraction is pure: the same text and
//! expectation always produce the same result.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::entities::{
    CollectionMetadata, Subtask, Task, TaskCollection, TaskComplexityAnalysis, TaskPriority,
    TaskStatus,
};
use crate::errors::{TasksError, TasksResult};

use super::schemas::{GeneratedComplexity, GeneratedMetadata, GeneratedSubtask, GeneratedTask};

/// Top-level shape expected in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// `{ "tasks": [...], "metadata": {...} }`
    Object,
    /// `[ ... ]`
    Array,
}

impl ExtractMode {
    const fn delimiters(self) -> (char, char) {
        match self {
            Self::Object => ('{', '}'),
            Self::Array => ('[', ']'),
        }
    }
}

/// What the caller asked for when requesting a PRD breakdown.
#[derive(Debug, Clone)]
pub struct BreakdownExpectation {
    pub num_tasks: u32,
    pub source_file: String,
    pub project_name: String,
    /// ISO calendar date used when metadata must be synthesized
    pub generated_at: String,
}

/// Slice the outermost JSON structure out of `text` and parse it.
pub fn extract_json(text: &str, mode: ExtractMode) -> TasksResult<Value> {
    let (open, close) = mode.delimiters();

    let start = text
        .find(open)
        .ok_or_else(|| TasksError::extraction(format!("no '{open}' found in response")))?;
    let end = text
        .rfind(close)
        .filter(|end| *end > start)
        .ok_or_else(|| TasksError::extraction(format!("no closing '{close}' found in response")))?;

    serde_json::from_str(&text[start..=end])
        .map_err(|e| TasksError::extraction(format!("response is not valid JSON: {e}")))
}

/// Extract and normalize a PRD breakdown.
pub fn extract_task_collection(
    text: &str,
    expectation: &BreakdownExpectation,
) -> TasksResult<TaskCollection> {
    let mut root = extract_json(text, ExtractMode::Object)?;

    let raw_tasks = match root.get_mut("tasks").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => return Err(TasksError::extraction("response has no 'tasks' array")),
    };
    let generated: Vec<GeneratedTask> = decode_items(raw_tasks, "task")?;

    if generated.len() != expectation.num_tasks as usize {
        warn!(
            "Expected {} tasks but the model returned {}; keeping all of them",
            expectation.num_tasks,
            generated.len()
        );
    }

    let tasks = normalize_tasks(generated);

    let metadata = match root.get_mut("metadata").map(Value::take) {
        Some(value @ Value::Object(_)) => {
            let supplied: GeneratedMetadata = serde_json::from_value(value)
                .map_err(|e| TasksError::extraction(format!("invalid metadata: {e}")))?;
            CollectionMetadata {
                project_name: supplied
                    .project_name
                    .unwrap_or_else(|| expectation.project_name.clone()),
                total_tasks: supplied
                    .total_tasks
                    .map_or(tasks.len(), |n| n as usize),
                source_file: supplied
                    .source_file
                    .unwrap_or_else(|| expectation.source_file.clone()),
                generated_at: supplied
                    .generated_at
                    .unwrap_or_else(|| expectation.generated_at.clone()),
            }
        }
        _ => {
            debug!("Response carried no metadata; synthesizing it");
            CollectionMetadata {
                project_name: expectation.project_name.clone(),
                total_tasks: tasks.len(),
                source_file: expectation.source_file.clone(),
                generated_at: expectation.generated_at.clone(),
            }
        }
    };

    Ok(TaskCollection { tasks, metadata })
}

/// Extract and normalize an expansion into subtasks numbered from `offset`.
///
/// Dependencies on ids the model assigned are remapped to the renumbered
/// siblings. Anything left that is not below the subtask's own id is dropped,
/// which still admits existing subtasks under the offset.
pub fn extract_subtasks(text: &str, parent_task_id: u32, offset: u32) -> TasksResult<Vec<Subtask>> {
    let generated: Vec<GeneratedSubtask> = extract_array(text, "subtask")?;

    let mut id_map: HashMap<u32, u32> = HashMap::new();
    for (raw, id) in generated.iter().zip(offset..=u32::MAX) {
        if let Some(declared) = raw.id {
            id_map.entry(declared).or_insert(id);
        }
    }

    let subtasks = generated
        .into_iter()
        .zip(offset..=u32::MAX)
        .map(|(raw, id)| {
            if raw.id != Some(id) {
                debug!("Corrected subtask id {:?} to {id}", raw.id);
            }
            let mut dependencies = Vec::new();
            for dep in raw.dependencies {
                let target = id_map.get(&dep).copied().unwrap_or(dep);
                if target >= id {
                    warn!("Subtask {id} dropped dependency on {dep}: not an earlier subtask");
                } else if !dependencies.contains(&target) {
                    dependencies.push(target);
                }
            }

            let mut subtask = Subtask::new(id, parent_task_id, raw.title, raw.description);
            subtask.details = raw.details;
            subtask.dependencies = dependencies;
            subtask.status = TaskStatus::Pending;
            subtask
        })
        .collect();

    Ok(subtasks)
}

/// Extract complexity entries. A count mismatch is only a warning.
pub fn extract_complexity(
    text: &str,
    expected_count: usize,
) -> TasksResult<Vec<TaskComplexityAnalysis>> {
    let generated: Vec<GeneratedComplexity> = extract_array(text, "complexity entry")?;

    if generated.len() != expected_count {
        warn!(
            "Expected complexity analysis for {expected_count} tasks but the model returned {}",
            generated.len()
        );
    }

    generated
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let task_id = raw.task_id.ok_or_else(|| {
                TasksError::extraction(format!("complexity entry {index} has no taskId"))
            })?;
            let score = raw.complexity_score.unwrap_or(1).clamp(1, 10);
            Ok(TaskComplexityAnalysis {
                task_id,
                task_title: raw.task_title,
                complexity_score: u8::try_from(score).unwrap_or(10),
                recommended_subtasks: raw.recommended_subtasks.unwrap_or(0),
                expansion_prompt: raw.expansion_prompt,
                reasoning: raw.reasoning,
            })
        })
        .collect()
}

fn extract_array<T: DeserializeOwned>(text: &str, what: &str) -> TasksResult<Vec<T>> {
    let items = match extract_json(text, ExtractMode::Array)? {
        Value::Array(items) => items,
        _ => return Err(TasksError::extraction("response is not a JSON array")),
    };
    if items.is_empty() {
        return Err(TasksError::extraction(format!("no {what}s were generated")));
    }
    decode_items(items, what)
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> TasksResult<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(TasksError::extraction(format!("{what} {index} is not an object")));
            }
            serde_json::from_value(item)
                .map_err(|e| TasksError::extraction(format!("{what} {index} is malformed: {e}")))
        })
        .collect()
}

/// Renumber to `1..=n` when needed and drop invalid dependency references.
fn normalize_tasks(generated: Vec<GeneratedTask>) -> Vec<Task> {
    let sequential = generated
        .iter()
        .zip(1u32..)
        .all(|(task, expected)| task.id == Some(expected));

    let mut remap: HashMap<u32, u32> = HashMap::new();
    if !sequential {
        warn!("Task ids were not sequential from 1; renumbering in declared order");
        for (task, new_id) in generated.iter().zip(1u32..) {
            if let Some(old) = task.id {
                remap.entry(old).or_insert(new_id);
            }
        }
    }

    generated
        .into_iter()
        .zip(1u32..)
        .map(|(raw, id)| {
            let dependencies = raw
                .dependencies
                .iter()
                .filter_map(|dep| {
                    let target = if sequential { Some(*dep) } else { remap.get(dep).copied() };
                    match target {
                        Some(target) if (1..id).contains(&target) => Some(target),
                        _ => {
                            warn!("Dropping invalid dependency {dep} from task {id}");
                            None
                        }
                    }
                })
                .fold(Vec::new(), |mut acc, dep| {
                    if !acc.contains(&dep) {
                        acc.push(dep);
                    }
                    acc
                });

            let priority = raw.priority.parse::<TaskPriority>().unwrap_or_default();

            let mut task = Task::new(id, raw.title, raw.description);
            task.details = raw.details;
            task.test_strategy = raw.test_strategy;
            task.priority = priority;
            task.dependencies = dependencies;
            task
        })
        .collect()
}
