//! Configuration loading, validation, and management for ragline.
//!
//! Loads configuration from `~/.ragline/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragline/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generation backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model used when a request names none
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-stage generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Pipeline behavior settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Conversation memory bounds
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Stage system prompts
    #[serde(default)]
    pub prompts: PromptConfig,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "llama3-8b-8192".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("generation", &self.generation)
            .field("retrieval", &self.retrieval)
            .field("pipeline", &self.pipeline)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

/// Settings for one generation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Temperature for this stage
    pub temperature: f32,

    /// Cap on generated tokens
    pub max_tokens: u32,
}

/// Per-stage generation settings.
///
/// The first pass runs slightly warmer for natural phrasing; refinement runs
/// slightly cooler so the rewrite stays consistent with the draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_first_pass_stage")]
    pub first_pass: StageConfig,

    #[serde(default = "default_refinement_stage")]
    pub refinement: StageConfig,
}

fn default_first_pass_stage() -> StageConfig {
    StageConfig {
        temperature: 0.4,
        max_tokens: 400,
    }
}
fn default_refinement_stage() -> StageConfig {
    StageConfig {
        temperature: 0.3,
        max_tokens: 400,
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            first_pass: default_first_pass_stage(),
            refinement: default_refinement_stage(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many passages callers get by default
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum passages fetched per query regardless of the caller's
    /// `top_k` (queries answer better with wider context)
    #[serde(default = "default_top_k_floor")]
    pub top_k_floor: usize,
}

fn default_top_k() -> usize {
    5
}
fn default_top_k_floor() -> usize {
    8
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            top_k_floor: default_top_k_floor(),
        }
    }
}

/// What to do when the refinement stage fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementFailurePolicy {
    /// Abort the whole query; the first-pass text is never surfaced.
    #[default]
    Fail,
    /// Degrade to the unrefined first-pass answer, recording the
    /// refinement stage as failed in the result.
    FallBackToFirstPass,
}

/// Pipeline behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How many trailing history turns enter the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Refinement failure policy
    #[serde(default)]
    pub on_refinement_failure: RefinementFailurePolicy,
}

fn default_history_window() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            on_refinement_failure: RefinementFailurePolicy::default(),
        }
    }
}

/// Conversation memory bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum conversations held before the least-recently-updated one
    /// is evicted
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,

    /// Maximum exchanges kept per conversation (oldest dropped first)
    #[serde(default = "default_max_exchanges")]
    pub max_exchanges_per_conversation: usize,
}

fn default_max_conversations() -> usize {
    256
}
fn default_max_exchanges() -> usize {
    64
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_conversations: default_max_conversations(),
            max_exchanges_per_conversation: default_max_exchanges(),
        }
    }
}

/// Stage system prompts.
#[derive(Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// System directive for the grounded answering pass
    #[serde(default = "default_first_pass_prompt")]
    pub first_pass_system: String,

    /// System directive for the tone-rewriting pass
    #[serde(default = "default_refinement_prompt")]
    pub refinement_system: String,
}

impl std::fmt::Debug for PromptConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The prompts are long; Debug shows lengths only.
        f.debug_struct("PromptConfig")
            .field("first_pass_system", &self.first_pass_system.len())
            .field("refinement_system", &self.refinement_system.len())
            .finish()
    }
}

fn default_first_pass_prompt() -> String {
    "You are a helpful, knowledgeable assistant who answers questions based on the provided document context.\n\n\
IMPORTANT GUIDELINES:\n\
1. Answer like a real person would - naturally, conversationally, and directly\n\
2. If the information is in the context, provide it clearly and accurately\n\
3. If the information is NOT in the context, say \"I don't see that information in the document\" or similar\n\
4. Don't make assumptions or guess - only use what's explicitly stated in the context\n\
5. Be concise but thorough - give complete answers without unnecessary verbosity\n\
6. For simple questions, give simple answers\n\
7. If someone asks \"ok\" or similar, just acknowledge it briefly or ask for clarification\n\n\
Remember: You're having a natural conversation, not writing a formal report."
        .into()
}

fn default_refinement_prompt() -> String {
    "You are helping to make responses more natural and conversational.\n\n\
Your job is to:\n\
1. Make the response sound like a real person talking\n\
2. Remove any robotic or overly formal language\n\
3. Keep it concise and direct\n\
4. Maintain all the important information\n\
5. Make it feel like a natural conversation\n\n\
Examples of what to fix:\n\
- \"Based on the provided context\" -> Just give the answer directly\n\
- \"The information indicates that\" -> Just state the fact\n\
- \"According to the document\" -> Remove this phrase\n\
- \"Here is the refined response:\" -> Remove this\n\n\
Make it sound like you're talking to a friend, not writing a report."
        .into()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            first_pass_system: default_first_pass_prompt(),
            refinement_system: default_refinement_prompt(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragline/config.toml).
    ///
    /// Also checks environment variables:
    /// - `RAGLINE_API_KEY` (highest priority), then `GROQ_API_KEY`
    /// - `RAGLINE_MODEL` overrides the default model
    /// - `RAGLINE_BASE_URL` overrides the backend URL
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("RAGLINE_API_KEY")
                .ok()
                .or_else(|| std::env::var("GROQ_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("RAGLINE_MODEL") {
            config.default_model = model;
        }

        if let Ok(url) = std::env::var("RAGLINE_BASE_URL") {
            config.base_url = url;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragline")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (stage, cfg) in [
            ("first_pass", &self.generation.first_pass),
            ("refinement", &self.generation.refinement),
        ] {
            if cfg.temperature < 0.0 || cfg.temperature > 2.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{stage} temperature must be between 0.0 and 2.0"
                )));
            }
            if cfg.max_tokens == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{stage} max_tokens must be > 0"
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError("top_k must be > 0".into()));
        }

        if self.pipeline.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "history_window must be > 0".into(),
            ));
        }

        if self.memory.max_conversations == 0 || self.memory.max_exchanges_per_conversation == 0 {
            return Err(ConfigError::ValidationError(
                "memory bounds must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            pipeline: PipelineConfig::default(),
            memory: MemoryConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
