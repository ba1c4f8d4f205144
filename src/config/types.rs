// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub health: HealthConfig,
    pub storage: StorageConfig,
    pub proxy: ProxyConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Route prefix the proxy is mounted under (e.g. "/" or "/assets")
    pub mount_path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Enable health check endpoints
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    #[serde(default = "default_healthz_path")]
    pub liveness_path: String,
    /// Readiness probe path (default: /readyz)
    #[serde(default = "default_readyz_path")]
    pub readiness_path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_healthz_path() -> String {
    "/healthz".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_readyz_path() -> String {
    "/readyz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            liveness_path: default_healthz_path(),
            readiness_path: default_readyz_path(),
        }
    }
}

/// Which backend the blob store client talks to
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Azure Blob Storage container
    Azure,
    /// Directory on the local filesystem
    Local,
}

/// Blob store client configuration
///
/// Only used to construct the store client at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_key: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
    /// Custom endpoint, e.g. an Azurite emulator at `http://127.0.0.1:10000`
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Root directory for `kind = "local"`
    #[serde(default)]
    pub local_root: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicyConfig,
}

/// Retry policy handed to the store client
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetryPolicyConfig {
    pub max_retries: usize,
    pub retry_timeout_secs: u64,
    pub init_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_base: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_timeout_secs: 180,
            init_backoff_ms: 100,
            max_backoff_ms: 15_000,
            backoff_base: 2.0,
        }
    }
}

/// Proxy handler configuration as written in the config file
///
/// Converted into [`crate::proxy::ProxyOptions`] once at startup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProxyConfig {
    #[serde(default)]
    pub offset: u64,
    /// 0 reads to the end of the object
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub if_match: Option<String>,
    #[serde(default)]
    pub if_none_match: Option<String>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub if_modified_since: Option<String>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub if_unmodified_since: Option<String>,
    #[serde(default)]
    pub range_get_content_md5: bool,
    #[serde(default)]
    pub retry_reader: RetryReaderConfig,
    #[serde(default)]
    pub index_document_name: String,
    #[serde(default)]
    pub not_found_document_path: String,
}

/// Mid-stream resumption settings for object bodies
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReaderConfig {
    #[serde(default)]
    pub max_retry_requests: u32,
}
