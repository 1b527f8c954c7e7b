//! Configuration: built-in defaults, then `config.toml`, then environment.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GROQ_API_KEY` / `STORYCASE_API_KEY` | LLM API key | none |
//! | `STORYCASE_ENDPOINT` | Chat-completions endpoint | `https://api.groq.com/openai/v1/chat/completions` |
//! | `STORYCASE_MODEL` | Model name | `llama-3.1-8b-instant` |
//! | `STORYCASE_TEMPERATURE` | Sampling temperature | `0.7` |
//! | `STORYCASE_MAX_TOKENS` | Completion token cap | `4096` |
//! | `STORYCASE_MAX_RETRIES` | Retries for transient failures | `2` |
//! | `STORYCASE_TIMEOUT` | Request timeout (seconds) | `60` |
//! | `STORYCASE_DATA_DIR` | Project/test-case store | `<data dir>/storycase` |
//! | `STORYCASE_SUBSTITUTIONS` | Extra Vietnamese substitution table (TOML) | none |

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::testgen::fallback::FallbackPolicy;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COUNT: usize = 5;

pub const ENV_API_KEY: &str = "STORYCASE_API_KEY";
pub const ENV_API_KEY_GROQ: &str = "GROQ_API_KEY";
pub const ENV_ENDPOINT: &str = "STORYCASE_ENDPOINT";
pub const ENV_MODEL: &str = "STORYCASE_MODEL";
pub const ENV_TEMPERATURE: &str = "STORYCASE_TEMPERATURE";
pub const ENV_MAX_TOKENS: &str = "STORYCASE_MAX_TOKENS";
pub const ENV_MAX_RETRIES: &str = "STORYCASE_MAX_RETRIES";
pub const ENV_TIMEOUT: &str = "STORYCASE_TIMEOUT";
pub const ENV_DATA_DIR: &str = "STORYCASE_DATA_DIR";
pub const ENV_SUBSTITUTIONS: &str = "STORYCASE_SUBSTITUTIONS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub default_count: usize,
    pub fallback_min_vietnamese: usize,
    pub fallback_min_default: usize,
    pub substitutions_file: Option<PathBuf>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        let policy = FallbackPolicy::default();
        Self {
            default_count: DEFAULT_COUNT,
            fallback_min_vietnamese: policy.min_cases_vietnamese,
            fallback_min_default: policy.min_cases_default,
            substitutions_file: None,
        }
    }
}

impl GenerationSettings {
    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            min_cases_vietnamese: self.fallback_min_vietnamese,
            min_cases_default: self.fallback_min_default,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSettings,
    pub generation: GenerationSettings,
    pub storage: StorageSettings,
}

impl Config {
    /// File (if present and valid) with environment overrides applied.
    pub fn load() -> Self {
        let mut cfg = load_file().unwrap_or_default();
        cfg.apply_env(|key| env::var(key).ok());
        cfg
    }

    /// Overlay values from `lookup` (normally the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY).or_else(|| lookup(ENV_API_KEY_GROQ)) {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key.trim().to_string());
            }
        }
        if let Some(v) = lookup(ENV_ENDPOINT) {
            self.llm.endpoint = v;
        }
        if let Some(v) = lookup(ENV_MODEL) {
            self.llm.model = v;
        }
        if let Some(v) = lookup(ENV_TEMPERATURE).and_then(|s| s.parse().ok()) {
            self.llm.temperature = v;
        }
        if let Some(v) = lookup(ENV_MAX_TOKENS).and_then(|s| s.parse().ok()) {
            self.llm.max_tokens = v;
        }
        if let Some(v) = lookup(ENV_MAX_RETRIES).and_then(|s| s.parse().ok()) {
            self.llm.max_retries = v;
        }
        if let Some(v) = lookup(ENV_TIMEOUT).and_then(|s| s.parse().ok()) {
            self.llm.timeout_secs = v;
        }
        if let Some(v) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_SUBSTITUTIONS) {
            self.generation.substitutions_file = Some(PathBuf::from(v));
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("storycase")
        })
    }

    /// Persist the API key into the config file, keeping everything else.
    pub fn save_api_key(key: &str) -> std::io::Result<PathBuf> {
        let mut cfg = load_file().unwrap_or_default();
        cfg.llm.api_key = Some(key.trim().to_string());

        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&cfg)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&path, raw)?;
        Ok(path)
    }
}

pub fn config_path() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("storycase");
    dir.push("config.toml");
    dir
}

fn load_file() -> Option<Config> {
    let path = config_path();
    let raw = fs::read_to_string(&path).ok()?;
    match toml::from_str(&raw) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            None
        }
    }
}
