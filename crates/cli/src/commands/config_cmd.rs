//! `medtutor config`: configuration management commands.

use std::path::Path;

use super::{config_file, load_config};

const REDACTED: &str = "***";

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some(REDACTED.into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", config_file(config_path).display());
}

pub fn init(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let file = config_file(config_path);
    if file.exists() {
        println!("⚠️  Config already exists at: {}", file.display());
        println!("   Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    if let Some(dir) = file.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&file, medtutor_config::AppConfig::default_toml())?;
    println!("✅ Created {}", file.display());
    println!("\n📝 Next steps:");
    println!("   1. Set OPENAI_API_KEY, or LOCAL_MODE=true for a local model");
    println!("   2. Run: medtutor seed");
    println!("   3. Run: medtutor serve");
    Ok(())
}
