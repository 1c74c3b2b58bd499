//! Catalog Search Infrastructure Library
//!
//! Infrastructure components for the catalog search service: the HTTP client
//! for the Elasticsearch-compatible engine and logging setup.

use catalog_core::{CatalogConfig, Result, SearchEngine};
use std::sync::Arc;

pub mod elastic;
pub mod logger;

pub use elastic::*;
pub use logger::*;

/// Infrastructure version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the engine client described by the configuration
pub fn connect(config: &CatalogConfig) -> Result<Arc<ElasticClient>> {
    tracing::info!(
        "Connecting to search engine at {} (index {})",
        config.engine.url,
        config.engine.index
    );
    Ok(Arc::new(ElasticClient::new(ElasticConfig::from(
        &config.engine,
    ))?))
}

/// Health status for infrastructure components
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub engine_reachable: bool,
    pub version: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.engine_reachable
    }
}

/// Health check for infrastructure components
///
/// # Examples
///
/// ```no_run
/// use catalog_core::CatalogConfig;
/// use catalog_infra::{connect, health_check};
///
/// # tokio_test::block_on(async {
/// let client = connect(&CatalogConfig::default()).unwrap();
/// let status = health_check(client.as_ref()).await;
/// println!("engine reachable: {}", status.engine_reachable);
/// # });
/// ```
pub async fn health_check(engine: &dyn SearchEngine) -> HealthStatus {
    let engine_reachable = match engine.health().await {
        Ok(up) => up,
        Err(e) => {
            tracing::warn!("Engine health check errored: {}", e);
            false
        }
    };

    HealthStatus {
        engine_reachable,
        version: VERSION.to_string(),
    }
}
