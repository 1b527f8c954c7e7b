use crate::llm::client::{Decoding, LlmClient, LlmError};
use crate::llm::prompt::LlmPrompt;

/// Text-in, text-out seam between the pipeline and whatever produces completions.
pub trait CompletionBackend {
    fn complete(&self, prompt: &LlmPrompt, decoding: Decoding) -> Result<String, LlmError>;

    fn name(&self) -> &str {
        "backend"
    }
}

impl CompletionBackend for LlmClient {
    fn complete(&self, prompt: &LlmPrompt, decoding: Decoding) -> Result<String, LlmError> {
        self.run(prompt, decoding).map(|r| r.text)
    }

    fn name(&self) -> &str {
        self.model()
    }
}

impl<T: CompletionBackend + ?Sized> CompletionBackend for &T {
    fn complete(&self, prompt: &LlmPrompt, decoding: Decoding) -> Result<String, LlmError> {
        (**self).complete(prompt, decoding)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Returns a canned completion. For tests and offline runs.
#[derive(Debug, Clone)]
pub struct MockBackend {
    pub response: String,
}

impl MockBackend {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl CompletionBackend for MockBackend {
    fn complete(&self, _prompt: &LlmPrompt, _decoding: Decoding) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Always fails with a network error.
#[derive(Debug, Clone, Default)]
pub struct FailingBackend;

impl CompletionBackend for FailingBackend {
    fn complete(&self, _prompt: &LlmPrompt, _decoding: Decoding) -> Result<String, LlmError> {
        Err(LlmError::Network("connection refused".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
