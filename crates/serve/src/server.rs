//! HTTP server for the catalog API

use crate::api::create_routes;
use crate::handlers::AppState;
use crate::ServerConfig;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    Router,
};
use catalog_core::{CatalogConfig, CatalogError, Result, SearchEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Catalog HTTP server
pub struct CatalogServer {
    config: ServerConfig,
    app: Router,
}

impl CatalogServer {
    /// Create a new server around prepared application state
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let app = create_app(&config, state);
        Self { config, app }
    }

    /// Start the server and serve until the listener fails
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| CatalogError::validation(format!("Invalid address {}: {}", addr, e)))?;

        tracing::info!("Starting catalog server on {}", addr);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| CatalogError::network(format!("Failed to bind to {}: {}", addr, e)))?;

        axum::serve(listener, self.app)
            .await
            .map_err(|e| CatalogError::network(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fully layered router
    pub fn router(&self) -> Router {
        self.app.clone()
    }
}

/// Create the Axum application with middleware
pub fn create_app(config: &ServerConfig, state: AppState) -> Router {
    let mut app = create_routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.max_request_size)),
    );

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE]);

        app = app.layer(cors);
    }

    app
}

/// Server builder for configuration
pub struct ServerBuilder {
    config: ServerConfig,
    catalog: CatalogConfig,
    engine: Arc<dyn SearchEngine>,
}

impl ServerBuilder {
    /// Create a new server builder over an engine handle
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            engine,
        }
    }

    /// Take listener settings and limits from a loaded configuration
    pub fn catalog_config(mut self, catalog: CatalogConfig) -> Self {
        self.config = ServerConfig::from(&catalog.server);
        self.catalog = catalog;
        self
    }

    /// Set the host address
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enabled: bool) -> Self {
        self.config.cors_enabled = enabled;
        self
    }

    /// Set maximum request size
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.max_request_size = size;
        self
    }

    /// Build the server
    pub fn build(self) -> CatalogServer {
        let state = AppState::new(self.engine, self.catalog);
        CatalogServer::new(self.config, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog_core::engine::{BulkIndexReport, EngineResponse, IndexStats};
    use catalog_core::query::CompiledQuery;
    use catalog_core::Product;
    use serde_json::Value;

    struct OfflineEngine;

    #[async_trait]
    impl SearchEngine for OfflineEngine {
        async fn execute(&self, _query: &CompiledQuery) -> Result<EngineResponse> {
            Err(CatalogError::network("offline"))
        }
        async fn get_by_id(&self, _id: &str) -> Result<Option<Product>> {
            Ok(None)
        }
        async fn index_one(&self, _product: &Product) -> Result<()> {
            Ok(())
        }
        async fn index_bulk(&self, _products: &[Product]) -> Result<BulkIndexReport> {
            Ok(BulkIndexReport::default())
        }
        async fn update_by_id(&self, _id: &str, _changes: &Value) -> Result<bool> {
            Ok(false)
        }
        async fn delete_by_id(&self, _id: &str) -> Result<bool> {
            Ok(false)
        }
        async fn stats(&self) -> Result<IndexStats> {
            Ok(IndexStats::default())
        }
        async fn health(&self) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_server_builder() {
        let server = ServerBuilder::new(Arc::new(OfflineEngine))
            .host("0.0.0.0")
            .port(8080)
            .cors(false)
            .max_request_size(5 * 1024 * 1024)
            .build();

        assert_eq!(server.config().host, "0.0.0.0");
        assert_eq!(server.config().port, 8080);
        assert!(!server.config().cors_enabled);
        assert_eq!(server.config().max_request_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_builder_takes_catalog_settings() {
        let mut catalog = CatalogConfig::default();
        catalog.server.port = 9191;
        catalog.server.host = "0.0.0.0".to_string();

        let server = ServerBuilder::new(Arc::new(OfflineEngine))
            .catalog_config(catalog)
            .build();
        assert_eq!(server.config().port, 9191);
        assert_eq!(server.config().host, "0.0.0.0");
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let server = ServerBuilder::new(Arc::new(OfflineEngine))
            .host("not an address")
            .build();
        assert!(matches!(
            server.start().await,
            Err(CatalogError::Validation { .. })
        ));
    }
}
