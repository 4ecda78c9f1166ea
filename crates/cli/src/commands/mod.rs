pub mod ask;
pub mod classify;
pub mod config_cmd;
pub mod doctor;
pub mod seed;
pub mod serve;

use medtutor_config::AppConfig;
use std::path::{Path, PathBuf};

pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}").into())
}

pub(crate) fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}
