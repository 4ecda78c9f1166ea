//! `medtutor seed`: load knowledge base entries from a JSON file.

use medtutor_store::SqliteDatabase;
use std::path::Path;

use super::load_config;

pub async fn run(config_path: Option<&Path>, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    if !file.exists() {
        return Err(format!("Seed file not found: {}", file.display()).into());
    }

    let db = SqliteDatabase::open(&config.database.url, config.database.max_connections).await?;
    let knowledge = db.knowledge();
    let result = medtutor_store::seed_from_file(&knowledge, file).await;
    db.close().await;
    let report = result?;

    println!("🌱 Seeded {} from {}", config.database.url, file.display());
    println!("   Inserted: {}", report.inserted);
    println!("   Updated:  {}", report.updated);
    if report.skipped > 0 {
        println!("   ⚠️  Skipped {} invalid entr(y/ies)", report.skipped);
    }

    Ok(())
}
