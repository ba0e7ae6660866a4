//! Init command implementation

use crate::config::{Config, PathsConfig, CONFIG_TEMPLATE};
use crate::error::{Error, Result};
use crate::store::InsightStore;
use std::path::PathBuf;
use tracing::info;

/// Initialize insightdash configuration and database
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let base = base_dir.unwrap_or_else(Config::default_base_dir);
    let paths = PathsConfig::under(&base);

    if paths.config_file.exists() && !force {
        return Err(Error::AlreadyInitialized(base.display().to_string()));
    }

    std::fs::create_dir_all(&base)?;
    std::fs::write(&paths.config_file, CONFIG_TEMPLATE)?;
    info!("Created config at {:?}", paths.config_file);

    let config = Config::load(&paths.config_file)?;

    let store = InsightStore::connect(&config).await?;
    store.init_schema().await?;
    info!("Created database at {:?}", config.paths.db_file);

    Ok(config)
}

/// Print the outcome of `init`
pub fn print_init(config: &Config) {
    println!("✓ Initialized insightdash at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Database: {:?}", config.paths.db_file);
    println!("\nNext steps:");
    println!("  insightdash ingest ./jsondata.json     # Load insight records");
    println!("  insightdash serve                      # Start the REST API");
    println!("  insightdash list --country razil       # Filter from the shell");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config_and_database() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("dash");

        let config = cmd_init(Some(base.clone()), false).await.unwrap();
        assert!(config.is_initialized());
        assert_eq!(config.paths.db_file, base.join("insights.db"));

        let err = cmd_init(Some(base.clone()), false).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));

        assert!(cmd_init(Some(base), true).await.is_ok());
    }
}
