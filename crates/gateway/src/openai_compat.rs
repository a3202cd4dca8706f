//! OpenAI-compatible gateway implementation.
//!
//! Works with Groq, OpenAI, and any backend exposing an OpenAI-compatible
//! `/v1/chat/completions` endpoint.
//!
//! The backend's wire schema is modeled explicitly as serde structs with
//! defaulted optional fields; normalization into [`GenerationResult`] is a
//! single deserialization step followed by [`normalize`], so no response
//! shape inspection survives past this module.

use async_trait::async_trait;
use ragline_core::error::GatewayError;
use ragline_core::gateway::{Gateway, GatewayRequest, GenerationResult, ModelInfo, TokenUsage};
use serde::Deserialize;
use tracing::{debug, warn};

/// An OpenAI-compatible generation gateway.
pub struct OpenAiCompatGateway {
    name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatGateway {
    /// Create a new OpenAI-compatible gateway.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: default_model.into(),
            client,
        }
    }

    /// Create a Groq gateway (convenience constructor).
    pub fn groq(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::new(
            "groq",
            "https://api.groq.com/openai/v1",
            api_key,
            default_model,
        )
    }

    /// Create an OpenAI gateway (convenience constructor).
    pub fn openai(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            default_model,
        )
    }

    /// Build the JSON request body, folding in passthrough options.
    fn to_api_body(&self, request: &GatewayRequest) -> serde_json::Value {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut body = serde_json::json!({
            "model": model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        // Passthrough options land beside the known fields, never over them.
        if let Some(obj) = body.as_object_mut() {
            for (key, value) in &request.options {
                obj.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        body
    }
}

/// Normalize a parsed wire response into the canonical result.
///
/// Always takes the first choice. Missing usage becomes zeroed usage,
/// a missing finish reason becomes `"stop"`, and a missing model name
/// falls back to the requested one: the invariant is that callers never
/// see a partially populated result.
fn normalize(
    response: ApiResponse,
    requested_model: &str,
) -> Result<GenerationResult, GatewayError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(GatewayError::EmptyResponse)?;

    let usage = response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(GenerationResult {
        text: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".into()),
        usage,
        model_name: response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}

#[async_trait]
impl Gateway for OpenAiCompatGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: GatewayRequest,
    ) -> std::result::Result<GenerationResult, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let requested_model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let body = self.to_api_body(&request);

        debug!(gateway = %self.name, model = %requested_model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::BackendFailure(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(GatewayError::BackendFailure(format!(
                "status {status}: {error_body}"
            )));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::BackendFailure(format!("malformed response: {e}")))?;

        normalize(api_response, &requested_model)
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        let url = format!("{}/models", self.base_url);
        let response = match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(gateway = %self.name, error = %e, "Model listing failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            return Vec::new();
        }

        let body: ModelListResponse = match response.json().await {
            Ok(b) => b,
            Err(_) => return Vec::new(),
        };

        body.data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: if m.owned_by.is_empty() {
                    self.name.clone()
                } else {
                    m.owned_by
                },
            })
            .collect()
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(r) => r.status().is_success(),
            Err(_) => false,
        }
    }
}

// --- Wire schema (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    owned_by: String,
}
