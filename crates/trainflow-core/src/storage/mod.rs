mod config;
pub mod database;

pub use config::Config;
pub use database::{Database, PlanCount, PlanSummary, SessionRecord, Stats, TrendPoint};

use std::path::PathBuf;

/// Returns `~/.config/trainflow[-dev]/` based on TRAINFLOW_ENV.
///
/// Set TRAINFLOW_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TRAINFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("trainflow-dev")
    } else {
        base_dir.join("trainflow")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
