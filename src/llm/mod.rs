pub mod backend;
pub mod client;
pub mod orchestrator;
pub mod prompt;

pub use backend::CompletionBackend;
pub use client::{Decoding, LlmClient, LlmError};
pub use orchestrator::{generate, CaseSource, FallbackReason, GenerationOptions, GenerationOutcome, MAX_CASES};
