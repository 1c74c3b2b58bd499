//! HTTP handlers for products, index statistics and health

use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use catalog_core::bench::{BenchmarkHarness, Clock, SystemClock};
use catalog_core::engine::{BulkIndexReport, BulkItemResult};
use catalog_core::shaper::{shape_index_stats, StatsSummary};
use catalog_core::{CatalogConfig, Product, SearchEngine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn SearchEngine>,
    pub harness: BenchmarkHarness,
    pub config: Arc<CatalogConfig>,
}

impl AppState {
    /// Create application state around a shared engine handle
    pub fn new(engine: Arc<dyn SearchEngine>, config: CatalogConfig) -> Self {
        Self::with_clock(engine, config, Arc::new(SystemClock))
    }

    /// Create application state with an explicit benchmark clock
    pub fn with_clock(
        engine: Arc<dyn SearchEngine>,
        config: CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            harness: BenchmarkHarness::new(engine.clone(), clock),
            engine,
            config: Arc::new(config),
        }
    }

    pub fn max_page_size(&self) -> u32 {
        self.config.server.max_page_size
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub engine: bool,
    pub timestamp: DateTime<Utc>,
}

/// Handler for server health check
///
/// Responds 503 when the engine is unreachable.
pub async fn handle_health_check(State(state): State<AppState>) -> impl IntoResponse {
    let engine = match state.engine.health().await {
        Ok(up) => up,
        Err(e) => {
            warn!("Engine health check failed: {}", e);
            false
        }
    };

    let (status, label) = if engine {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: crate::VERSION.to_string(),
            engine,
            timestamp: Utc::now(),
        }),
    )
}

/// Outcome of a single-document write
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub id: String,
    pub result: String,
}

impl MutationResponse {
    fn new(id: &str, result: &str) -> Self {
        Self {
            id: id.to_string(),
            result: result.to_string(),
        }
    }
}

fn product_not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("Product {} not found", id))
}

/// Handler for fetching one product
pub async fn handle_get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    match state.engine.get_by_id(&id).await? {
        Some(product) => Ok(Json(product)),
        None => Err(product_not_found(&id)),
    }
}

/// Handler for creating a product
///
/// A missing id is generated.
pub async fn handle_create_product(
    State(state): State<AppState>,
    payload: Result<Json<Product>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(mut product) = payload?;
    product.validate()?;
    let id = product.ensure_id();

    state.engine.index_one(&product).await?;
    info!("Created product {}", id);

    Ok((StatusCode::CREATED, Json(product)))
}

/// Fields a partial update may not touch
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "createdAt"];

fn validate_changes(changes: &serde_json::Map<String, Value>) -> ApiResult<()> {
    if changes.is_empty() {
        return Err(ApiError::bad_request("Update must contain at least one field"));
    }
    if let Some(field) = IMMUTABLE_FIELDS.iter().find(|f| changes.contains_key(**f)) {
        return Err(ApiError::bad_request(format!("Field {} cannot be updated", field)));
    }

    for field in ["price", "rating"] {
        if let Some(value) = changes.get(field) {
            let valid = value.as_f64().is_some_and(|v| {
                v >= 0.0 && (field != "rating" || v <= 5.0)
            });
            if !valid {
                return Err(ApiError::bad_request(format!("Invalid value for {}", field)));
            }
        }
    }
    for field in ["name", "category"] {
        if let Some(value) = changes.get(field) {
            if value.as_str().map_or(true, |s| s.trim().is_empty()) {
                return Err(ApiError::bad_request(format!("{} cannot be empty", field)));
            }
        }
    }
    Ok(())
}

/// Handler for partially updating a product
pub async fn handle_update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let Json(body) = payload?;
    let mut changes = match body {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("Update body must be a JSON object")),
    };
    validate_changes(&changes)?;
    changes.insert("updatedAt".to_string(), serde_json::json!(Utc::now()));

    if !state.engine.update_by_id(&id, &Value::Object(changes)).await? {
        return Err(product_not_found(&id));
    }

    info!("Updated product {}", id);
    Ok(Json(MutationResponse::new(&id, "updated")))
}

/// Handler for deleting a product
pub async fn handle_delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MutationResponse>> {
    if !state.engine.delete_by_id(&id).await? {
        return Err(product_not_found(&id));
    }

    info!("Deleted product {}", id);
    Ok(Json(MutationResponse::new(&id, "deleted")))
}

/// Bulk indexing outcome
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    pub items: Vec<BulkItemResult>,
}

/// Handler for bulk indexing
///
/// Products failing validation are reported alongside engine failures
/// instead of failing the whole request.
pub async fn handle_bulk_index(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Product>>, JsonRejection>,
) -> ApiResult<Json<BulkResponse>> {
    let Json(products) = payload?;
    if products.is_empty() {
        return Err(ApiError::bad_request("At least one product is required"));
    }

    let mut rejected = Vec::new();
    let mut valid = Vec::with_capacity(products.len());
    for mut product in products {
        product.ensure_id();
        match product.validate() {
            Ok(()) => valid.push(product),
            Err(e) => rejected.push(BulkItemResult {
                id: product.id.clone(),
                success: false,
                error: Some(e.to_string()),
            }),
        }
    }

    let mut report = if valid.is_empty() {
        BulkIndexReport::default()
    } else {
        state.engine.index_bulk(&valid).await?
    };
    report.items.extend(rejected);
    let report = BulkIndexReport::from_items(report.items);

    let total = report.items.len();
    let failed = report.error_count;
    info!("Bulk request indexed {} of {} products", total - failed, total);

    Ok(Json(BulkResponse {
        total,
        indexed: report.indexed_count(),
        failed,
        items: report.items,
    }))
}

/// Handler for index statistics
pub async fn handle_stats(State(state): State<AppState>) -> ApiResult<Json<StatsSummary>> {
    let stats = state.engine.stats().await?;
    Ok(Json(shape_index_stats(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_validate_changes() {
        assert!(validate_changes(&object(json!({ "price": 12.5 }))).is_ok());
        assert!(validate_changes(&object(json!({ "rating": 5 }))).is_ok());
        assert!(validate_changes(&object(json!({}))).is_err());
        assert!(validate_changes(&object(json!({ "id": "other" }))).is_err());
        assert!(validate_changes(&object(json!({ "price": -1 }))).is_err());
        assert!(validate_changes(&object(json!({ "rating": 7 }))).is_err());
        assert!(validate_changes(&object(json!({ "price": "cheap" }))).is_err());
        assert!(validate_changes(&object(json!({ "name": " " }))).is_err());
    }

    #[test]
    fn test_mutation_response_serialization() {
        let body = serde_json::to_value(MutationResponse::new("p1", "deleted")).unwrap();
        assert_eq!(body, json!({ "id": "p1", "result": "deleted" }));
    }
}
