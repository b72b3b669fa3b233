use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub cloud_service_name: String,

    /// HS256 secret for bearer tokens. Auth is off when unset.
    pub auth_jwt_secret: Option<String>,

    /// Base URL of the document service. An in-memory store is used when unset.
    pub doc_service_url: Option<String>,

    #[serde(default = "default_doc_service_timeout_secs")]
    pub doc_service_timeout_secs: u64,

    /// How long a closed room's snapshot stays warm
    #[serde(default = "default_snapshot_cache_ttl_secs")]
    pub snapshot_cache_ttl_secs: u64,

    #[serde(default = "default_snapshot_cache_capacity")]
    pub snapshot_cache_capacity: u64,

    /// Write dirty snapshots back to the document store when a room empties
    #[serde(default = "default_persist_on_close")]
    pub persist_on_close: bool,

    /// Path the WebSocket endpoint is mounted on
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_jwt_secret.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn doc_service_timeout(&self) -> Duration {
        Duration::from_secs(self.doc_service_timeout_secs)
    }

    pub fn snapshot_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_cache_ttl_secs)
    }

    /// Allowed CORS origins, or `None` to allow any origin.
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() { None } else { Some(origins) }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            cloud_service_name: default_service_name(),
            auth_jwt_secret: None,
            doc_service_url: None,
            doc_service_timeout_secs: default_doc_service_timeout_secs(),
            snapshot_cache_ttl_secs: default_snapshot_cache_ttl_secs(),
            snapshot_cache_capacity: default_snapshot_cache_capacity(),
            persist_on_close: default_persist_on_close(),
            ws_path: default_ws_path(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "colabri-sync".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_doc_service_timeout_secs() -> u64 {
    10
}

fn default_snapshot_cache_ttl_secs() -> u64 {
    300
}

fn default_snapshot_cache_capacity() -> u64 {
    10_000
}

fn default_persist_on_close() -> bool {
    true
}

fn default_ws_path() -> String {
    "/ws/docs".to_string()
}
