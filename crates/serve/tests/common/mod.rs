//! Shared helpers for API integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use catalog_core::engine::{BulkIndexReport, BulkItemResult, EngineResponse, IndexStats};
use catalog_core::query::CompiledQuery;
use catalog_core::{CatalogConfig, CatalogError, Product, Result, SearchEngine};
use catalog_serve::{create_app, AppState, ServerConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// In-memory engine recording every compiled query body
pub struct StubEngine {
    pub products: Mutex<HashMap<String, Product>>,
    pub queries: Mutex<Vec<Value>>,
    pub search_response: Value,
    pub healthy: bool,
    pub fail_search: bool,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self {
            products: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            search_response: json!({ "took": 1, "hits": { "total": { "value": 0 }, "hits": [] } }),
            healthy: true,
            fail_search: false,
        }
    }
}

impl StubEngine {
    pub fn with_response(search_response: Value) -> Self {
        Self {
            search_response,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_search: true,
            healthy: false,
            ..Default::default()
        }
    }

    pub fn last_query(&self) -> Value {
        self.queries
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchEngine for StubEngine {
    async fn execute(&self, query: &CompiledQuery) -> Result<EngineResponse> {
        self.queries.lock().unwrap().push(query.to_body());
        if self.fail_search {
            return Err(CatalogError::engine(
                "search failed with status 503: cluster unavailable",
            ));
        }
        Ok(serde_json::from_value(self.search_response.clone())?)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.products.lock().unwrap().get(id).cloned())
    }

    async fn index_one(&self, product: &Product) -> Result<()> {
        self.products
            .lock()
            .unwrap()
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn index_bulk(&self, products: &[Product]) -> Result<BulkIndexReport> {
        let mut store = self.products.lock().unwrap();
        let items = products
            .iter()
            .map(|p| {
                store.insert(p.id.clone(), p.clone());
                BulkItemResult {
                    id: p.id.clone(),
                    success: true,
                    error: None,
                }
            })
            .collect();
        Ok(BulkIndexReport::from_items(items))
    }

    async fn update_by_id(&self, id: &str, changes: &Value) -> Result<bool> {
        let mut store = self.products.lock().unwrap();
        let Some(product) = store.get_mut(id) else {
            return Ok(false);
        };
        let mut doc = serde_json::to_value(&*product)?;
        if let (Some(target), Some(patch)) = (doc.as_object_mut(), changes.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        *product = serde_json::from_value(doc)?;
        Ok(true)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        Ok(self.products.lock().unwrap().remove(id).is_some())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let docs = self.products.lock().unwrap().len() as u64;
        Ok(IndexStats {
            doc_count: docs,
            size_bytes: 3 * 1024 * 1024,
            search: catalog_core::engine::SearchTimings {
                query_total: 4,
                query_time_ms: 10,
            },
            ..Default::default()
        })
    }

    async fn health(&self) -> Result<bool> {
        Ok(self.healthy)
    }
}

/// Router over the given engine with default configuration
pub fn router(engine: Arc<StubEngine>) -> Router {
    create_app(
        &ServerConfig::default(),
        AppState::new(engine, CatalogConfig::default()),
    )
}

/// Sends one request and returns the status with the parsed JSON body
pub async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().uri(uri).method(method);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, value)
}

pub async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    send(router, "GET", uri, None).await
}

pub async fn post(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, "POST", uri, Some(body)).await
}

/// Product payload accepted by the create endpoint
pub fn product_json(name: &str, category: &str, price: f64) -> Value {
    json!({
        "name": name,
        "description": format!("{} description", name),
        "category": category,
        "price": price,
        "rating": 4.2,
        "inStock": true,
        "tags": ["wireless"]
    })
}
