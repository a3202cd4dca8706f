//! CLI command implementations.

pub mod ask;
pub mod models;

use ragline_config::AppConfig;
use ragline_gateway::OpenAiCompatGateway;

/// Build the configured gateway, or explain what's missing.
pub fn build_gateway(config: &AppConfig) -> Result<OpenAiCompatGateway, Box<dyn std::error::Error>> {
    let Some(api_key) = config.api_key.clone() else {
        return Err(
            "No API key configured. Set RAGLINE_API_KEY or GROQ_API_KEY, or add \
             api_key to ~/.ragline/config.toml"
                .into(),
        );
    };

    let name = if config.base_url.contains("groq") {
        "groq"
    } else if config.base_url.contains("openai") {
        "openai"
    } else {
        "custom"
    };

    Ok(OpenAiCompatGateway::new(
        name,
        &config.base_url,
        api_key,
        &config.default_model,
    ))
}
