//! Gateway trait: the normalization boundary over generation backends.
//!
//! A Gateway sends a chat-style message list to one configured backend and
//! returns a single canonical [`GenerationResult`]. Whatever shape the
//! backend answers in, the distinction is erased here, permanently, for all
//! downstream code: callers never see a partially-shaped or backend-specific
//! structure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// The role of a chat message sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single role-tagged message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Target model. `None` falls back to the gateway's configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Ordered role-tagged messages.
    pub messages: Vec<ChatMessage>,

    /// Generation randomness control.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Open set of passthrough generation options, forwarded verbatim.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: serde_json::Map<String, serde_json::Value>,
}

fn default_temperature() -> f32 {
    0.7
}

impl GatewayRequest {
    /// A request with just messages; everything else defaulted.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            model: None,
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            options: serde_json::Map::new(),
        }
    }
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The canonical result of one completion.
///
/// Invariant: always fully populated. When the backend omits usage or a
/// finish reason, the gateway substitutes zero usage and `"stop"` rather
/// than leaking the absence downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The generated text (first candidate).
    pub text: String,

    /// Why generation stopped ("stop" when the backend says nothing).
    pub finish_reason: String,

    /// Token usage (zeroed when the backend omits it).
    pub usage: TokenUsage,

    /// Which model actually responded (may differ from requested).
    pub model_name: String,
}

/// One advertised model in a backend's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: String,
}

/// The gateway trait every generation backend implements.
///
/// One request in, one canonical result out. No retry, no caching: a
/// backend failure surfaces immediately to the caller.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "groq", "openai").
    fn name(&self) -> &str;

    /// Issue a single chat completion and normalize the response.
    async fn complete(
        &self,
        request: GatewayRequest,
    ) -> std::result::Result<GenerationResult, GatewayError>;

    /// List the backend's advertised models.
    ///
    /// Backs a liveness probe only: on backend failure this degrades to an
    /// empty list rather than propagating an error.
    async fn list_models(&self) -> Vec<ModelInfo> {
        Vec::new()
    }

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> bool {
        true
    }
}
