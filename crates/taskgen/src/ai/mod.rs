//! AI integration for task generation.
//!
//! This module provides:
//! - Backend traits for generation and research, with vendor adapters
//! - Prompt templates for PRD breakdown, expansion and complexity analysis
//! - Extraction of JSON payloads from free-form model output
//! - The generation client and research augmenter used by the orchestrator

pub mod anthropic;
pub mod client;
pub mod extract;
pub mod perplexity;
pub mod prompts;
pub mod provider;
pub mod research;
pub mod schemas;

pub use anthropic::AnthropicProvider;
pub use client::GenerationClient;
pub use extract::{extract_json, BreakdownExpectation, ExtractMode};
pub use perplexity::PerplexityProvider;
pub use prompts::PromptManager;
pub use provider::{
    AIResponse, GenerateOptions, GeneratorBackend, PromptPair, ResearchBackend, TokenUsage,
};
pub use research::{ResearchAugmenter, ResearchFactory};
