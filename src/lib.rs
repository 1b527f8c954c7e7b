//! Story-to-test-case generation with an LLM backend and a deterministic
//! fallback, plus the project store, export and Jira adapters around it.

pub mod config;
pub mod export;
pub mod jira;
pub mod llm;
pub mod logger;
pub mod persistence;
pub mod project;
pub mod state;
pub mod story;
pub mod testgen;

pub use llm::{generate, CaseSource, CompletionBackend, GenerationOptions, GenerationOutcome, LlmClient, LlmError};
pub use project::ProjectSettings;
pub use testgen::TestCase;
