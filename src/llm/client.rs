// src/llm/client.rs

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::llm::prompt::LlmPrompt;

const PROMPT_ABI_VERSION: &str = "v1-storycase-testcases";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured (set GROQ_API_KEY or run `storycase config set-key`)")]
    MissingApiKey,
    #[error("authentication failed ({status}): {body}")]
    Authentication { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed request ({status}): {body}")]
    MalformedRequest { status: u16, body: String },
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Errors worth spending a retry on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Network(_) | LlmError::Timeout | LlmError::RateLimited(_) | LlmError::Server { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct LlmRunResult {
    pub text: String,
    pub prompt_hash: String,
    pub attempts: u32,
}

/// Per-request overrides of the configured decoding parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoding {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Blocking client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    settings: LlmSettings,
    api_key: String,
    http: reqwest::blocking::Client,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.settings.endpoint)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Fails fast when no key is configured; nothing can be generated without one.
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?
            .to_string();

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            settings,
            api_key,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Execute the request, retrying transient failures up to `max_retries` times.
    pub fn run(&self, prompt: &LlmPrompt, decoding: Decoding) -> Result<LlmRunResult, LlmError> {
        let prompt_hash = hash_prompt(prompt);
        let body = self.build_body(prompt, decoding);
        let attempts = self.settings.max_retries + 1;

        let mut attempt = 1;
        loop {
            debug!(attempt, prompt_hash = %prompt_hash, model = %self.settings.model, "sending completion request");

            match self.send_once(&body) {
                Ok(text) => {
                    info!(attempt, prompt_hash = %prompt_hash, chars = text.len(), "completion received");
                    return Ok(LlmRunResult {
                        text,
                        prompt_hash,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(attempt, error = %e, "transient LLM failure, retrying");
                    thread::sleep(Duration::from_millis(350 * attempt as u64));
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "LLM request failed");
                    return Err(e);
                }
            }
        }
    }

    fn build_body(&self, prompt: &LlmPrompt, decoding: Decoding) -> Value {
        json!({
            "model": self.settings.model,
            "temperature": decoding.temperature.unwrap_or(self.settings.temperature),
            "max_tokens": decoding.max_tokens.unwrap_or(self.settings.max_tokens),
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user }
            ]
        })
    }

    fn send_once(&self, body: &Value) -> Result<String, LlmError> {
        let resp = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(classify_transport)?;

        let status = resp.status();
        let raw = resp.text().map_err(classify_transport)?;

        if !status.is_success() {
            return Err(classify_status(status, raw));
        }

        let json: Value =
            serde_json::from_str(&raw).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        extract_text(&json)
    }
}

fn hash_prompt(prompt: &LlmPrompt) -> String {
    let mut h = Sha256::new();
    h.update(PROMPT_ABI_VERSION.as_bytes());
    h.update(prompt.system.as_bytes());
    h.update(prompt.user.as_bytes());
    hex::encode(h.finalize())
}

fn classify_transport(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(e.to_string())
    }
}

fn classify_status(status: StatusCode, body: String) -> LlmError {
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Authentication { status: code, body },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(body),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LlmError::Timeout,
        s if s.is_server_error() => LlmError::Server { status: code, body },
        _ => LlmError::MalformedRequest { status: code, body },
    }
}

fn extract_text(v: &Value) -> Result<String, LlmError> {
    v.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_owned)
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))
}
