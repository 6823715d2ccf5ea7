//! Configuration management for LitGraph services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote catalog (OpenAlex) configuration
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Graph build limits
    #[serde(default)]
    pub graph: GraphConfig,

    /// Snapshot cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds (builds issue hundreds of catalog calls)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Catalog provider: openalex, mock
    #[serde(default = "default_catalog_provider")]
    pub provider: String,

    /// Catalog API base URL
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Contact email sent as the `mailto` parameter (polite pool)
    pub mailto: Option<String>,

    /// Override for the descriptive user-agent header
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request (429/5xx/transport)
    #[serde(default = "default_catalog_retries")]
    pub max_retries: u32,

    /// Outbound requests per second
    #[serde(default = "default_catalog_rps")]
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    /// Root candidates kept after ranking
    #[serde(default = "default_n_roots")]
    pub n_roots: usize,

    /// Branch candidates kept after ranking
    #[serde(default = "default_n_branches")]
    pub n_branches: usize,

    /// Maximum citing works fetched as branch seeds
    #[serde(default = "default_branch_seeds_limit")]
    pub branch_seeds_limit: usize,

    /// Maximum works fetched for an author graph
    #[serde(default = "default_max_author_works")]
    pub max_author_works: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis URL; cache is disabled when unset
    pub url: Option<String>,

    /// Snapshot TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_cache_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Expose the Prometheus endpoint
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 300 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_catalog_provider() -> String { "openalex".to_string() }
fn default_catalog_base_url() -> String { "https://api.openalex.org".to_string() }
fn default_catalog_timeout() -> u64 { 30 }
fn default_catalog_retries() -> u32 { 3 }
fn default_catalog_rps() -> u32 { 10 }
fn default_n_roots() -> usize { 25 }
fn default_n_branches() -> usize { 25 }
fn default_branch_seeds_limit() -> usize { 200 }
fn default_max_author_works() -> usize { 100 }
fn default_cache_ttl() -> u64 { 86_400 }
fn default_cache_prefix() -> String { "litgraph".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_enabled() -> bool { true }
fn default_service_name() -> String { "litgraph".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__CATALOG__MAILTO=team@example.org
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get catalog request timeout as Duration
    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.timeout_secs)
    }

    /// True when a Redis snapshot cache is configured
    pub fn cache_enabled(&self) -> bool {
        self.cache.url.is_some()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            provider: default_catalog_provider(),
            base_url: default_catalog_base_url(),
            mailto: None,
            user_agent: None,
            timeout_secs: default_catalog_timeout(),
            max_retries: default_catalog_retries(),
            requests_per_second: default_catalog_rps(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            n_roots: default_n_roots(),
            n_branches: default_n_branches(),
            branch_seeds_limit: default_branch_seeds_limit(),
            max_author_works: default_max_author_works(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            ttl_secs: default_cache_ttl(),
            key_prefix: default_cache_prefix(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_metrics_enabled(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            graph: GraphConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
