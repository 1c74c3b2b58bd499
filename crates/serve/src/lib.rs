//! Catalog Search Serve Library
//!
//! REST facade for the product catalog: product CRUD, search, facets,
//! analytics, custom aggregations and query benchmarking.

use catalog_core::config::ServerSettings;

pub mod api;
pub mod error;
pub mod handlers;
pub mod performance;
pub mod search;
pub mod server;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::*;
pub use server::*;

/// Server version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Listener and middleware settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            cors_enabled: settings.cors_enabled,
            max_request_size: settings.max_request_size,
        }
    }
}
