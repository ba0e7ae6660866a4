//! Configuration management for insightdash
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Ingestion configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path prefix the API is mounted under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// SQLite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// JSON file loaded when `ingest` is run without a path
    #[serde(default = "default_data_file", skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,

    /// Draw a progress bar while inserting rows
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for insightdash data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            show_progress: default_show_progress(),
        }
    }
}

impl PathsConfig {
    /// Derive all paths from a base directory
    pub fn under(base: &Path) -> Self {
        Self {
            config_file: base.join("config.toml"),
            db_file: base.join("insights.db"),
            base_dir: base.to_path_buf(),
        }
    }
}

impl Config {
    /// Get the default base directory for insightdash (~/.insightdash)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".insightdash")
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        // The database lives next to the config file
        let base = config_path.parent().unwrap_or(Path::new("."));
        config.paths = PathsConfig::under(base);
        config.paths.config_file = config_path.to_path_buf();

        config.apply_bind_override(std::env::var(BIND_ADDR_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    /// when no config file exists there yet
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        let paths = PathsConfig::under(&base);

        if paths.config_file.exists() {
            return Self::load(&paths.config_file);
        }

        debug!("No config file found at {:?}, using defaults", paths.config_file);
        let mut config = Config {
            paths,
            ..Config::default()
        };
        config.apply_bind_override(std::env::var(BIND_ADDR_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace `server.bind_addr` with a non-empty override value
    pub fn apply_bind_override(&mut self, bind_addr: Option<String>) {
        if let Some(addr) = bind_addr.filter(|a| !a.trim().is_empty()) {
            debug!("Overriding bind address with {} from {}", addr, BIND_ADDR_ENV);
            self.server.bind_addr = addr.trim().to_string();
        }
    }

    /// Check if insightdash is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Parsed listen address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind_addr.parse().map_err(|_| {
            Error::Config(format!(
                "server.bind_addr is not a socket address: {}",
                self.server.bind_addr
            ))
        })
    }

    /// Resolve the ingestion input: an explicit path wins over the configured one
    pub fn resolve_data_file(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        explicit
            .or_else(|| self.ingest.data_file.clone())
            .ok_or_else(|| {
                Error::Config(
                    "No data file given: pass a path, set INSIGHTDASH_DATA_FILE, \
                     or set ingest.data_file"
                        .to_string(),
                )
            })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        if !self.server.api_prefix.starts_with('/') {
            return Err(Error::Config(
                "server.api_prefix must start with '/'".to_string(),
            ));
        }

        if self.server.api_prefix.len() > 1 && self.server.api_prefix.ends_with('/') {
            return Err(Error::Config(
                "server.api_prefix must not end with '/'".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.ingest.show_progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config {
            paths: PathsConfig::under(tmp.path()),
            ..Config::default()
        };
        config.server.api_prefix = "/v1".to_string();
        config.ingest.data_file = Some(PathBuf::from("/data/jsondata.json"));

        std::fs::write(
            &config.paths.config_file,
            toml::to_string_pretty(&config).unwrap(),
        )
        .unwrap();

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.server.api_prefix, "/v1");
        assert_eq!(
            loaded.ingest.data_file,
            Some(PathBuf::from("/data/jsondata.json"))
        );
        assert_eq!(loaded.paths.db_file, tmp.path().join("insights.db"));
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(Some(tmp.path().join("fresh"))).unwrap();
        assert_eq!(config.paths.db_file, tmp.path().join("fresh/insights.db"));
        assert!(!config.is_initialized());
    }

    #[test]
    fn test_bind_env_overrides_written_template() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("config.toml"), CONFIG_TEMPLATE).unwrap();

        std::env::set_var(BIND_ADDR_ENV, "0.0.0.0:9100");
        let loaded = Config::load_from(Some(tmp.path().to_path_buf()));
        std::env::remove_var(BIND_ADDR_ENV);

        let loaded = loaded.unwrap();
        assert_eq!(loaded.server.bind_addr, "0.0.0.0:9100");
        assert_eq!(loaded.bind_addr().unwrap().port(), 9100);
    }

    #[test]
    fn test_blank_bind_override_is_ignored() {
        let mut config = Config::default();
        config.apply_bind_override(Some("  ".to_string()));
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
        config.apply_bind_override(None);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
    }

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.server.bind_addr = "localhost".to_string();
        assert!(config.validate().is_err());
        config.server.bind_addr = "127.0.0.1:8000".to_string();

        config.server.api_prefix = "api".to_string();
        assert!(config.validate().is_err());
        config.server.api_prefix = "/api/".to_string();
        assert!(config.validate().is_err());
        config.server.api_prefix = "/".to_string();
        assert!(config.validate().is_ok());

        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_data_file_prefers_explicit_path() {
        let mut config = Config::default();
        config.ingest.data_file = Some(PathBuf::from("/configured.json"));

        let explicit = config
            .resolve_data_file(Some(PathBuf::from("/cli.json")))
            .unwrap();
        assert_eq!(explicit, PathBuf::from("/cli.json"));
        assert_eq!(
            config.resolve_data_file(None).unwrap(),
            PathBuf::from("/configured.json")
        );

        config.ingest.data_file = None;
        assert!(config.resolve_data_file(None).is_err());
    }
}
