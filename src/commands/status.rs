//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{InsightStats, InsightStore};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub bind_addr: String,
    pub api_prefix: String,
    pub data_file: Option<String>,
    pub db_stats: InsightStats,
}

/// Get system status
pub async fn cmd_status(config: &Config, store: &InsightStore) -> Result<StatusInfo> {
    info!("Getting status");

    let db_stats = store.get_stats().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        bind_addr: config.server.bind_addr.clone(),
        api_prefix: config.server.api_prefix.clone(),
        data_file: config
            .ingest
            .data_file
            .as_ref()
            .map(|p| p.display().to_string()),
        db_stats,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 insightdash Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!(
        "Data file: {}",
        status.data_file.as_deref().unwrap_or("(not configured)")
    );
    println!("\nAPI:");
    println!("  Address: {}", status.bind_addr);
    println!("  Prefix: {}", status.api_prefix);

    let stats = &status.db_stats;
    println!("\nDatabase Stats:");
    println!("  Insights: {}", stats.insight_count);
    if stats.insight_count == 0 {
        println!("  (empty - run 'insightdash ingest' to load data)");
        return;
    }
    println!("  Topics: {}", stats.topic_count);
    println!("  Countries: {}", stats.country_count);
    println!("  Regions: {}", stats.region_count);
    println!("  Sectors: {}", stats.sector_count);
    println!("  Sources: {}", stats.source_count);
    println!("  Without published date: {}", stats.unpublished_count);
}
