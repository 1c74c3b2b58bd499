//! Search API handlers
//!
//! # Endpoints
//!
//! - `GET /api/search?q=...&category=...` - query-string search
//! - `POST /api/search` - the same search with a JSON body
//! - `GET /api/search/facets` - facet counts for a query and filter set

use crate::error::ApiResult;
use crate::handlers::AppState;
use crate::search::types::{SearchBody, SearchParams};
use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Json, Query, State,
};
use catalog_core::aggregation::builders;
use catalog_core::query::{compile, compile_aggregations, SearchRequest};
use catalog_core::shaper::{shape_facets, Facets, SearchPage};
use tracing::info;

/// GET search handler
///
/// # Query Parameters
///
/// - `q`: free text (optional, absent means match everything)
/// - `type`: `multiMatch` (default), `phraseMatch`, `wildcard`, `fuzzy`, `matchAll`
/// - `category`, `minPrice`, `maxPrice`, `minRating`, `inStock`, `tags` (comma list)
/// - `page` (1-based), `limit`, `sortBy`, `sortOrder`
///
/// # Errors
///
/// Returns 400 for unparsable parameters or invalid pagination and filters
pub async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<SearchPage>> {
    let Query(params) = params?;
    run_search(&state, params.into_request()).await
}

/// POST search handler with the same fields as a JSON body
pub async fn handle_search_post(
    State(state): State<AppState>,
    payload: Result<Json<SearchBody>, JsonRejection>,
) -> ApiResult<Json<SearchPage>> {
    let Json(body) = payload?;
    run_search(&state, body.into_request()).await
}

async fn run_search(state: &AppState, request: SearchRequest) -> ApiResult<Json<SearchPage>> {
    request.validate(state.max_page_size())?;

    let query = compile(&request);
    let response = state.engine.execute(&query).await?;
    let page = SearchPage::from_response(&response, &request);

    info!(
        "Search '{}' ({}) returned {} of {} hits in {}ms",
        request.free_text.as_deref().unwrap_or(""),
        request.search_type,
        page.products.len(),
        page.total,
        page.took_ms
    );

    Ok(Json(page))
}

/// Facet handler
///
/// Accepts the search parameters; pagination and sort are ignored.
pub async fn handle_facets(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<Facets>> {
    let Query(params) = params?;
    let request = params.into_request();
    request.filters.validate()?;

    let query = compile_aggregations(&request, builders::facets());
    let response = state.engine.execute(&query).await?;

    Ok(Json(shape_facets(&response)))
}
