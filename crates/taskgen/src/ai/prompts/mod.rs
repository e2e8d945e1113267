//! Prompt template system for AI operations.
//!
//! This module provides:
//! - Handlebars-based prompt templates (escaping disabled)
//! - Pre-defined templates for breakdown, expansion, complexity and research
//! - Rendering into a [`PromptPair`]
//!
//! Rendering is pure: no I/O, no backend knowledge.

use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashMap;

use crate::errors::{TasksError, TasksResult};

use super::provider::PromptPair;

mod analyze_complexity;
mod expand_task;
mod parse_prd;
mod research;

pub use analyze_complexity::AnalyzeComplexityContext;
pub use expand_task::{ExpandTaskContext, TaskSummary};
pub use parse_prd::ParsePrdContext;
pub use research::ResearchContext;

/// Template IDs
pub const PARSE_PRD: &str = "parse-prd";
pub const EXPAND_TASK: &str = "expand-task";
pub const ANALYZE_COMPLEXITY: &str = "analyze-complexity";
pub const RESEARCH_QUERY: &str = "research-query";

/// A prompt template with system and user messages.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template ID
    pub id: String,
    /// Description
    pub description: String,
    /// System prompt template
    pub system: String,
    /// User prompt template
    pub user: String,
}

impl PromptTemplate {
    /// Create a new prompt template.
    pub fn new(id: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            system: system.into(),
            user: user.into(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Render the template with the given context.
    pub fn render<T: Serialize>(&self, context: &T) -> TasksResult<PromptPair> {
        let mut handlebars = create_handlebars();

        handlebars
            .register_template_string("system", &self.system)
            .map_err(|e| TasksError::ConfigError {
                reason: format!("Invalid system template '{}': {e}", self.id),
            })?;

        handlebars
            .register_template_string("user", &self.user)
            .map_err(|e| TasksError::ConfigError {
                reason: format!("Invalid user template '{}': {e}", self.id),
            })?;

        let system = handlebars
            .render("system", context)
            .map_err(|e| TasksError::ConfigError {
                reason: format!("Failed to render system prompt '{}': {e}", self.id),
            })?;

        let user = handlebars
            .render("user", context)
            .map_err(|e| TasksError::ConfigError {
                reason: format!("Failed to render user prompt '{}': {e}", self.id),
            })?;

        Ok(PromptPair { system, user })
    }
}

/// Create a Handlebars instance with custom helpers.
fn create_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    // Prompts embed text verbatim
    handlebars.register_escape_fn(handlebars::no_escape);

    // Helper: {{{json value}}}
    handlebars.register_helper(
        "json",
        Box::new(
            |h: &handlebars::Helper,
             _: &Handlebars,
             _: &handlebars::Context,
             _: &mut handlebars::RenderContext,
             out: &mut dyn handlebars::Output| {
                if let Some(param) = h.param(0) {
                    let json = serde_json::to_string_pretty(param.value())
                        .unwrap_or_else(|_| "null".to_string());
                    out.write(&json)?;
                }
                Ok(())
            },
        ),
    );

    handlebars
}

/// Prompt manager for loading and rendering templates.
pub struct PromptManager {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptManager {
    /// Create a new prompt manager with default templates.
    pub fn new() -> Self {
        let mut manager = Self {
            templates: HashMap::new(),
        };

        manager.register(parse_prd::template());
        manager.register(expand_task::template());
        manager.register(analyze_complexity::template());
        manager.register(research::template());

        manager
    }

    /// Register a template, replacing any with the same ID.
    pub fn register(&mut self, template: PromptTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Get a template by ID.
    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.templates.get(id)
    }

    /// Render a template with context.
    pub fn render<T: Serialize>(&self, id: &str, context: &T) -> TasksResult<PromptPair> {
        let template = self.get(id).ok_or_else(|| TasksError::ConfigError {
            reason: format!("Template '{id}' not found"),
        })?;
        template.render(context)
    }

    /// Render the PRD breakdown prompt.
    pub fn parse_prd(&self, context: &ParsePrdContext) -> TasksResult<PromptPair> {
        self.render(PARSE_PRD, context)
    }

    /// Render the subtask expansion prompt.
    pub fn expand_task(&self, context: &ExpandTaskContext) -> TasksResult<PromptPair> {
        self.render(EXPAND_TASK, context)
    }

    /// Render the complexity analysis prompt.
    pub fn analyze_complexity(&self, context: &AnalyzeComplexityContext) -> TasksResult<PromptPair> {
        self.render(ANALYZE_COMPLEXITY, context)
    }

    /// Render the research query prompt.
    pub fn research_query(&self, context: &ResearchContext) -> TasksResult<PromptPair> {
        self.render(RESEARCH_QUERY, context)
    }
}

impl Default for PromptManager {
    fn default() -> Self {
        Self::new()
    }
}
