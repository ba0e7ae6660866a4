//! Default values for configuration

/// Environment variable that overrides `server.bind_addr`
pub const BIND_ADDR_ENV: &str = "INSIGHTDASH_BIND";

/// Default address the API server binds to
pub fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

/// Default mount point for the REST API
pub fn default_api_prefix() -> String {
    "/api".to_string()
}

/// Default SQLite pool size
pub fn default_max_connections() -> u32 {
    5
}

/// Default JSON data file for ingestion (none unless set in the environment)
pub fn default_data_file() -> Option<std::path::PathBuf> {
    std::env::var_os("INSIGHTDASH_DATA_FILE").map(std::path::PathBuf::from)
}

/// Show a progress bar while ingesting
pub fn default_show_progress() -> bool {
    true
}

/// Starter config written by `insightdash init`
pub const CONFIG_TEMPLATE: &str = r#"# insightdash configuration

[server]
# Address for `insightdash serve` (INSIGHTDASH_BIND overrides it)
bind_addr = "127.0.0.1:8000"
# Mount point of the REST API
api_prefix = "/api"

[database]
max_connections = 5

[ingest]
# JSON array of insight records loaded by `insightdash ingest`
# data_file = "/path/to/jsondata.json"
show_progress = true
"#;
