//! Lenient shapes for model-generated JSON.
//!
//! Models routinely emit numbers as strings, omit optional fields or use
//! `null`. These structs accept all of that and leave normalization to the
//! extractor.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A task as emitted by the model during PRD breakdown.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTask {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub details: String,
    #[serde(default, deserialize_with = "lenient_string", alias = "test_strategy")]
    pub test_strategy: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: String,
    #[serde(default, deserialize_with = "lenient_dependencies")]
    pub dependencies: Vec<u32>,
}

/// Collection metadata as emitted by the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMetadata {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub project_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub total_tasks: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub source_file: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub generated_at: Option<String>,
}

/// A subtask as emitted by the model. Its `id` and `status` are never
/// trusted, so they are not captured.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSubtask {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub details: String,
    #[serde(default, deserialize_with = "lenient_dependencies")]
    pub dependencies: Vec<u32>,
}

/// A complexity entry as emitted by the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedComplexity {
    #[serde(default, deserialize_with = "lenient_id")]
    pub task_id: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub task_title: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub complexity_score: Option<u32>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub recommended_subtasks: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expansion_prompt: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reasoning: String,
}

/// Read a non-negative integer from a number or a numeric string.
///
/// Dotted references such as `"3.2"` resolve to their last segment.
pub fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.rsplit('.').next().and_then(|tail| tail.parse().ok()))
        }
        _ => None,
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_u32))
}

fn lenient_dependencies<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_as_u32).collect(),
        _ => Vec::new(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}
