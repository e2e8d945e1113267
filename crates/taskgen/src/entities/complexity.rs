//! Complexity analysis report.

use serde::{Deserialize, Serialize};

/// Analysis of a single task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskComplexityAnalysis {
    pub task_id: u32,
    pub task_title: String,
    /// Score from 1 (trivial) to 10 (very complex)
    pub complexity_score: u8,
    pub recommended_subtasks: u32,
    pub expansion_prompt: String,
    pub reasoning: String,
}

/// Report metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReportMeta {
    /// ISO calendar date (`YYYY-MM-DD`)
    pub generated_at: String,
    pub tasks_analyzed: usize,
    pub threshold_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default)]
    pub used_research: bool,
}

/// Full complexity report, one analysis per input task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub meta: ComplexityReportMeta,
    pub complexity_analysis: Vec<TaskComplexityAnalysis>,
}

impl ComplexityReport {
    /// Look up the analysis for a task.
    pub fn get_task_analysis(&self, task_id: u32) -> Option<&TaskComplexityAnalysis> {
        self.complexity_analysis.iter().find(|a| a.task_id == task_id)
    }

    /// Tasks scoring at or above the report threshold.
    pub fn tasks_needing_expansion(&self) -> impl Iterator<Item = &TaskComplexityAnalysis> {
        self.complexity_analysis
            .iter()
            .filter(|a| a.complexity_score >= self.meta.threshold_score)
    }
}
