//! Configuration types for Catalog Search
//!
//! Configuration is layered: built-in defaults, then an optional YAML or JSON
//! file, then `CATALOG__SECTION__KEY` environment variables.

use crate::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Prefix of environment overrides, e.g. `CATALOG__ENGINE__URL`
pub const ENV_PREFIX: &str = "CATALOG";
const ENV_SEPARATOR: &str = "__";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Search engine connection
    #[serde(default)]
    pub engine: EngineConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Benchmark defaults and ceilings
    #[serde(default)]
    pub benchmark: BenchmarkSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search engine connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the engine's REST API
    #[serde(default = "default_engine_url")]
    pub url: String,
    /// Index holding the products
    #[serde(default = "default_index")]
    pub index: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            index: default_index(),
            timeout_seconds: default_timeout(),
            username: None,
            password: None,
        }
    }
}

impl EngineConfig {
    /// Parsed base URL
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.url)?)
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Maximum request body in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    /// Largest page a search may request
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            max_request_size: default_max_request_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// Benchmark defaults and the ceilings enforced on callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSettings {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Overall timeout in milliseconds
    #[serde(default = "default_bench_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            concurrency: default_concurrency(),
            timeout_ms: default_bench_timeout_ms(),
            max_iterations: default_max_iterations(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        // Try YAML first, then JSON
        match serde_yaml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(_) => {
                let config = serde_json::from_str(&content)?;
                Ok(config)
            }
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Layered load: defaults, optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(CatalogError::not_found(format!(
                    "config file {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.engine.base_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(CatalogError::validation(
                "Engine URL must use http or https scheme",
            ));
        }

        if self.engine.index.trim().is_empty() {
            return Err(CatalogError::validation("Engine index cannot be empty"));
        }
        if self.engine.timeout_seconds == 0 {
            return Err(CatalogError::validation("Engine timeout must be positive"));
        }

        if self.server.max_page_size == 0 {
            return Err(CatalogError::validation("max_page_size must be positive"));
        }

        let bench = &self.benchmark;
        if bench.max_iterations == 0 || bench.max_concurrency == 0 {
            return Err(CatalogError::validation(
                "Benchmark ceilings must be positive",
            ));
        }
        if bench.iterations == 0 || bench.iterations > bench.max_iterations {
            return Err(CatalogError::validation(format!(
                "Benchmark iterations must be between 1 and {}",
                bench.max_iterations
            )));
        }
        if bench.concurrency == 0 || bench.concurrency > bench.max_concurrency {
            return Err(CatalogError::validation(format!(
                "Benchmark concurrency must be between 1 and {}",
                bench.max_concurrency
            )));
        }

        Ok(())
    }
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "products".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_max_request_size() -> usize {
    10 * 1024 * 1024
}

fn default_max_page_size() -> u32 {
    100
}

fn default_iterations() -> u32 {
    10
}

fn default_concurrency() -> usize {
    1
}

fn default_bench_timeout_ms() -> u64 {
    60_000
}

fn default_max_iterations() -> u32 {
    1000
}

fn default_max_concurrency() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
