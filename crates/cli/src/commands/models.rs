//! `ragline models`: backend liveness probe and model listing.

use ragline_config::AppConfig;
use ragline_core::gateway::Gateway;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let gateway = super::build_gateway(&config)?;

    println!("Backend: {} ({})", gateway.name(), config.base_url);

    let healthy = gateway.health_check().await;
    println!("Health:  {}", if healthy { "ok" } else { "unreachable" });

    let models = gateway.list_models().await;
    if models.is_empty() {
        println!("Models:  none advertised");
        return Ok(());
    }

    println!("Models:");
    for model in models {
        println!("  {:<40} {}", model.id, model.owned_by);
    }

    Ok(())
}
