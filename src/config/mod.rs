// Configuration module entry point
// Loads the startup configuration; nothing here is re-read per request

mod state;
mod types;

use chrono::{DateTime, Utc};
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, HealthConfig, LoggingConfig, PerformanceConfig, ProxyConfig, RetryPolicyConfig,
    RetryReaderConfig, ServerConfig, StorageConfig, StorageKind,
};

/// Errors raised while turning configuration into running components
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),
    #[error("invalid timestamp for {field}: '{value}' ({reason})")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        reason: chrono::ParseError,
    },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid storage configuration: {0}")]
    Storage(String),
}

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, LoadError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("BLOBPROXY").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.mount_path", "/")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("storage.kind", "azure")?
            .set_default("proxy.offset", 0)?
            .set_default("proxy.count", 0)?
            .set_default("proxy.range_get_content_md5", false)?
            .set_default("proxy.index_document_name", "")?
            .set_default("proxy.not_found_document_path", "")?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, LoadError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| LoadError::InvalidAddress(format!("{addr} ({e})")))
    }
}

/// Parse an optional RFC 3339 timestamp from the config file
pub fn parse_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, LoadError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(value)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|reason| LoadError::InvalidTimestamp {
            field,
            value: value.to_string(),
            reason,
        })
}
