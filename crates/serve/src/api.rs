//! Route table for the catalog REST API

use crate::handlers::{
    handle_bulk_index, handle_create_product, handle_delete_product, handle_get_product,
    handle_health_check, handle_stats, handle_update_product, AppState,
};
use crate::performance::{handle_benchmark, handle_test_scripts};
use crate::search::{
    handle_aggregations, handle_category_analytics, handle_facets, handle_price_distribution,
    handle_rating_distribution, handle_search, handle_search_post, handle_stock_status,
    handle_tag_popularity, handle_timeline,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Prefix of every route except `/health`
pub const API_PREFIX: &str = "/api";

/// API routes configuration
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handle_health_check))
        .nest(API_PREFIX, api_routes())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(handle_create_product))
        .route("/products/bulk", post(handle_bulk_index))
        .route(
            "/products/:id",
            get(handle_get_product)
                .put(handle_update_product)
                .delete(handle_delete_product),
        )
        .route("/search", get(handle_search).post(handle_search_post))
        .route("/search/facets", get(handle_facets))
        .route("/analytics/categories", get(handle_category_analytics))
        .route("/analytics/price-distribution", get(handle_price_distribution))
        .route("/analytics/ratings", get(handle_rating_distribution))
        .route("/analytics/tags", get(handle_tag_popularity))
        .route("/analytics/stock", get(handle_stock_status))
        .route("/analytics/timeline", get(handle_timeline))
        .route("/aggregations", post(handle_aggregations))
        .route("/stats", get(handle_stats))
        .route("/performance/benchmark", post(handle_benchmark))
        .route("/test-scripts/run", post(handle_test_scripts))
}
