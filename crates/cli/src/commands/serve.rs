//! `medtutor serve`: start the HTTP API.

use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🩺 MedTutor API");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} ({:?})", config.llm.model(), config.llm.mode);
    println!("   Database:  {}", config.database.url);
    if !config.has_api_key() {
        println!("   ⚠️  No API key set; answers will come from the knowledge base only");
    }

    medtutor_gateway::start(config).await?;

    Ok(())
}
