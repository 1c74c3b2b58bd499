//! Analytics and custom aggregation handlers
//!
//! Every view is an aggregation-only query; hits are never returned.

use crate::error::{ApiError, ApiResult};
use crate::handlers::AppState;
use crate::search::types::{
    AggregationRequest, AggregationResponse, AnalyticsResponse, PriceDistributionParams,
    TagParams, TimelineParams,
};
use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Json, Query, State,
};
use catalog_core::aggregation::{
    builders, AggregationName, AggregationSpec, DEFAULT_TERMS_SIZE,
};
use catalog_core::engine::{AggregationResult, EngineResponse};
use catalog_core::query::{compile_aggregations, QueryBuilder};
use catalog_core::shaper::{
    round_currency, round_rating, shape_category_analytics, shape_price_distribution,
    shape_rating_distribution, shape_stats, shape_stock_status, shape_tag_popularity,
    shape_timeline, CategoryAnalytics, PriceBucketSummary, RatingBucketSummary, StockSummary,
    TagSummary, TimelinePoint,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Field the timeline histogram buckets on
const TIMELINE_FIELD: &str = "createdAt";
/// Largest terms size a caller may request
const MAX_TERMS_SIZE: u32 = 500;

/// Runs one aggregation over the whole catalog
async fn run_view(
    state: &AppState,
    name: &str,
    spec: AggregationSpec,
) -> ApiResult<EngineResponse> {
    let query = QueryBuilder::aggregation_only(None, Vec::new())
        .aggregation(name, spec)
        .build();
    debug!("Running analytics view {}", name);
    Ok(state.engine.execute(&query).await?)
}

fn respond<T, F>(response: &EngineResponse, name: &str, shape: F) -> Json<AnalyticsResponse<T>>
where
    F: FnOnce(Option<AggregationResult<'_>>) -> Vec<T>,
{
    Json(AnalyticsResponse {
        buckets: shape(response.aggregation(name)),
        total: response.total(),
        took_ms: response.took_ms(),
    })
}

fn terms_size(size: Option<u32>) -> ApiResult<u32> {
    match size {
        None => Ok(DEFAULT_TERMS_SIZE),
        Some(0) => Err(ApiError::bad_request("size must be at least 1")),
        Some(n) if n > MAX_TERMS_SIZE => Err(ApiError::bad_request(format!(
            "size cannot exceed {}",
            MAX_TERMS_SIZE
        ))),
        Some(n) => Ok(n),
    }
}

/// Per-category counts, averages and in-stock share
pub async fn handle_category_analytics(
    State(state): State<AppState>,
) -> ApiResult<Json<AnalyticsResponse<CategoryAnalytics>>> {
    let key = AggregationName::Categories.key();
    let response = run_view(&state, key, builders::category_counts(DEFAULT_TERMS_SIZE)).await?;
    Ok(respond(&response, key, shape_category_analytics))
}

/// Price buckets for caller supplied or default breakpoints
pub async fn handle_price_distribution(
    State(state): State<AppState>,
    params: Result<Query<PriceDistributionParams>, QueryRejection>,
) -> ApiResult<Json<AnalyticsResponse<PriceBucketSummary>>> {
    let Query(params) = params?;
    let breakpoints = params.breakpoints()?;

    let key = AggregationName::PriceRanges.key();
    let response = run_view(&state, key, builders::price_ranges(&breakpoints)).await?;
    Ok(respond(&response, key, shape_price_distribution))
}

/// Rating buckets from 0 to 5
pub async fn handle_rating_distribution(
    State(state): State<AppState>,
) -> ApiResult<Json<AnalyticsResponse<RatingBucketSummary>>> {
    let key = AggregationName::Ratings.key();
    let response = run_view(&state, key, builders::rating_ranges()).await?;
    Ok(respond(&response, key, shape_rating_distribution))
}

/// Most used tags
pub async fn handle_tag_popularity(
    State(state): State<AppState>,
    params: Result<Query<TagParams>, QueryRejection>,
) -> ApiResult<Json<AnalyticsResponse<TagSummary>>> {
    let Query(params) = params?;
    let size = terms_size(params.size)?;

    let key = AggregationName::Tags.key();
    let response = run_view(&state, key, builders::tag_popularity(size)).await?;
    Ok(respond(&response, key, shape_tag_popularity))
}

/// In-stock versus out-of-stock split with price statistics
pub async fn handle_stock_status(
    State(state): State<AppState>,
) -> ApiResult<Json<AnalyticsResponse<StockSummary>>> {
    let key = AggregationName::Stock.key();
    let response = run_view(&state, key, builders::stock_split()).await?;
    Ok(respond(&response, key, shape_stock_status))
}

/// Products created per calendar interval
pub async fn handle_timeline(
    State(state): State<AppState>,
    params: Result<Query<TimelineParams>, QueryRejection>,
) -> ApiResult<Json<AnalyticsResponse<TimelinePoint>>> {
    let Query(params) = params?;
    let interval = params.interval();

    let key = AggregationName::Timeline.key();
    let spec = builders::date_histogram(TIMELINE_FIELD, interval);
    let response = run_view(&state, key, spec).await?;
    Ok(respond(&response, key, shape_timeline))
}

fn to_value<T: Serialize>(shaped: T) -> catalog_core::Result<Value> {
    Ok(serde_json::to_value(shaped)?)
}

/// Shapes one named aggregation of a custom aggregation response
pub fn shape_named(
    name: AggregationName,
    agg: Option<AggregationResult<'_>>,
) -> catalog_core::Result<Value> {
    match name {
        AggregationName::Categories => to_value(shape_category_analytics(agg)),
        AggregationName::PriceRanges => to_value(shape_price_distribution(agg)),
        AggregationName::Ratings => to_value(shape_rating_distribution(agg)),
        AggregationName::Tags => to_value(shape_tag_popularity(agg)),
        AggregationName::Stock => to_value(shape_stock_status(agg)),
        AggregationName::Timeline => to_value(shape_timeline(agg)),
        AggregationName::PriceStats => {
            to_value(agg.and_then(|a| a.stats()).map(|s| shape_stats(&s, round_currency)))
        }
        AggregationName::RatingStats => {
            to_value(agg.and_then(|a| a.stats()).map(|s| shape_stats(&s, round_rating)))
        }
    }
}

/// Custom aggregation handler
///
/// Computes the requested named aggregations over the population selected by
/// the optional free text and filters.
pub async fn handle_aggregations(
    State(state): State<AppState>,
    payload: Result<Json<AggregationRequest>, JsonRejection>,
) -> ApiResult<Json<AggregationResponse>> {
    let Json(request) = payload?;
    if request.aggregations.is_empty() {
        return Err(ApiError::bad_request("At least one aggregation is required"));
    }
    request.filters.validate()?;
    terms_size(request.size)?;
    let options = request.options()?;

    let mut names: Vec<AggregationName> = Vec::with_capacity(request.aggregations.len());
    for name in &request.aggregations {
        if !names.contains(name) {
            names.push(*name);
        }
    }

    let specs: IndexMap<String, AggregationSpec> = names
        .iter()
        .map(|name| (name.key().to_string(), name.build(&options)))
        .collect();

    let query = compile_aggregations(&request.population(), specs);

    let response = state.engine.execute(&query).await?;

    let mut aggregations = IndexMap::with_capacity(names.len());
    for name in names {
        let shaped = shape_named(name, response.aggregation(name.key()))?;
        aggregations.insert(name.key().to_string(), shaped);
    }

    info!("Computed {} aggregations", aggregations.len());
    Ok(Json(AggregationResponse {
        aggregations,
        total: response.total(),
        took_ms: response.took_ms(),
    }))
}
