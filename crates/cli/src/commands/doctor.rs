//! `medtutor doctor`: diagnose configuration, database and model backend.

use medtutor_config::{AppConfig, LlmMode};
use medtutor_core::knowledge::KnowledgeStore;
use medtutor_store::SqliteDatabase;
use std::path::Path;

use super::config_file;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 MedTutor Doctor, System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let file = config_file(config_path);
    if file.exists() {
        println!("  ✅ Config file found: {}", file.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `medtutor config init`)");
    }

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Cannot continue without a valid config.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        let mode = match config.llm.mode {
            LlmMode::Hosted => "hosted",
            LlmMode::Local => "local",
        };
        println!("  ✅ Model backend: {mode} ({})", config.llm.model());
    } else {
        println!("  ⚠️  No API key configured; set OPENAI_API_KEY or LOCAL_MODE=true");
        issues += 1;
    }

    match SqliteDatabase::open(&config.database.url, config.database.max_connections).await {
        Ok(db) => {
            match db.knowledge().count().await {
                Ok(0) => {
                    println!("  ⚠️  Knowledge base is empty; run `medtutor seed`");
                    issues += 1;
                }
                Ok(n) => println!("  ✅ Knowledge base: {n} entries"),
                Err(e) => {
                    println!("  ❌ Knowledge base unreadable: {e}");
                    issues += 1;
                }
            }
            db.close().await;
        }
        Err(e) => {
            println!("  ❌ Database {} failed to open: {e}", config.database.url);
            issues += 1;
        }
    }

    let provider = medtutor_providers::build_from_config(&config);
    match provider.health_check().await {
        Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
        Ok(false) => {
            println!("  ⚠️  Provider '{}' responded but is not healthy", provider.name());
            issues += 1;
        }
        Err(e) => {
            println!("  ⚠️  Provider '{}' unreachable: {e}", provider.name());
            println!("     Chat will answer from the knowledge base only.");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
