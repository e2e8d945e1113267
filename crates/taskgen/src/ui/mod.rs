//! Terminal UI helpers.
//!
//! This module uses println! for CLI output, which is appropriate
//! for terminal user interfaces.

#![allow(clippy::disallowed_macros)]

mod progress;

pub use progress::{ProgressGuard, ProgressReporter, SilentReporter, SpinnerReporter};

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::ai::TokenUsage;
use crate::entities::{ComplexityReport, Subtask, Task, TaskPriority, TaskStatus};

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::InProgress => Color::Cyan,
        TaskStatus::Done => Color::Green,
        TaskStatus::Cancelled => Color::Red,
        TaskStatus::Deferred => Color::Blue,
        TaskStatus::Review => Color::Magenta,
    }
}

fn join_ids(ids: &[u32]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
}

/// Create a table for displaying tasks
pub fn task_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Priority").fg(Color::Cyan),
        Cell::new("Deps").fg(Color::Cyan),
    ]);

    for task in tasks {
        let priority_color = match task.priority {
            TaskPriority::Low => Color::DarkGrey,
            TaskPriority::Medium => Color::White,
            TaskPriority::High => Color::Yellow,
        };

        table.add_row(vec![
            Cell::new(task.id),
            Cell::new(&task.title),
            Cell::new(task.status.to_string()).fg(status_color(task.status)),
            Cell::new(task.priority.to_string()).fg(priority_color),
            Cell::new(join_ids(&task.dependencies)),
        ]);
    }

    table
}

/// Create a table for a fresh expansion
pub fn subtask_table(subtasks: &[Subtask]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Deps").fg(Color::Cyan),
    ]);

    for subtask in subtasks {
        table.add_row(vec![
            Cell::new(subtask.full_id()).fg(Color::DarkGrey),
            Cell::new(&subtask.title),
            Cell::new(join_ids(&subtask.dependencies)),
        ]);
    }

    table
}

/// Create a table for a complexity report
pub fn complexity_table(report: &ComplexityReport) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Subtasks").fg(Color::Cyan),
    ]);

    for analysis in &report.complexity_analysis {
        let score_color = match analysis.complexity_score {
            0..=3 => Color::Green,
            4..=6 => Color::Yellow,
            _ => Color::Red,
        };

        table.add_row(vec![
            Cell::new(analysis.task_id),
            Cell::new(&analysis.task_title),
            Cell::new(analysis.complexity_score).fg(score_color),
            Cell::new(analysis.recommended_subtasks),
        ]);
    }

    table
}

/// Print token usage summary
pub fn print_usage(usage: &TokenUsage) {
    println!(
        "{} {} input, {} output, {} total tokens",
        "ℹ".blue().bold(),
        usage.input_tokens,
        usage.output_tokens,
        usage.total_tokens
    );
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
