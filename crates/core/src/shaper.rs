//! Result shaping
//!
//! Maps raw engine responses to the API's output records. Currency is rounded
//! to two decimals, ratings to one, percentages to whole numbers.

use crate::aggregation::{AVG_PRICE, AVG_RATING, IN_STOCK, PRICE_STATS};
use crate::engine::{AggregationResult, Bucket, EngineResponse, IndexStats, StatsAggregation};
use crate::query::SearchRequest;
use crate::types::Product;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Round half away from zero to `decimals` places
///
/// Rounds the shortest decimal form of the value, so 4.45 (stored as
/// 4.4499999...) rounds up while 0.1249999999995 rounds down.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // f64 Display never uses exponent notation
    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let places = decimals as usize;
    if fraction.len() <= places {
        return value;
    }

    let digits = format!("{}{}", whole, &fraction[..places]);
    let mut scaled = match digits.parse::<f64>() {
        Ok(scaled) => scaled,
        Err(_) => return value,
    };
    if fraction.as_bytes()[places] >= b'5' {
        scaled += 1.0;
    }
    (scaled / 10f64.powi(decimals as i32)).copysign(value)
}

pub fn round_currency(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round_rating(value: f64) -> f64 {
    round_to(value, 1)
}

/// `part / whole` as a whole-number percentage; an empty whole yields 0
pub fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 0) as u32
}

/// A matching product with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductHit {
    #[serde(flatten)]
    pub product: Product,
    pub score: Option<f64>,
}

/// Converts hits to products, skipping documents that do not deserialize
pub fn shape_hits(response: &EngineResponse) -> Vec<ProductHit> {
    response
        .hits
        .hits
        .iter()
        .filter_map(|hit| match serde_json::from_value::<Product>(hit.source.clone()) {
            Ok(mut product) => {
                if product.id.is_empty() {
                    product.id = hit.id.clone();
                }
                Some(ProductHit {
                    product,
                    score: hit.score,
                })
            }
            Err(e) => {
                warn!("Skipping hit {} with unreadable source: {}", hit.id, e);
                None
            }
        })
        .collect()
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub products: Vec<ProductHit>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub took_ms: u64,
}

impl SearchPage {
    pub fn from_response(response: &EngineResponse, request: &SearchRequest) -> Self {
        let total = response.total();
        let page_size = request.page_size.max(1);
        Self {
            products: shape_hits(response),
            total,
            page: request.page,
            page_size,
            total_pages: total.div_ceil(u64::from(page_size)),
            took_ms: response.took_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAnalytics {
    pub category: String,
    pub count: u64,
    pub avg_price: f64,
    pub avg_rating: f64,
    pub in_stock_count: u64,
    pub in_stock_percentage: u32,
}

pub fn shape_category_analytics(agg: Option<AggregationResult<'_>>) -> Vec<CategoryAnalytics> {
    buckets_of(agg)
        .iter()
        .map(|bucket| {
            let in_stock = bucket.sub_doc_count(IN_STOCK);
            CategoryAnalytics {
                category: bucket.key_string(),
                count: bucket.doc_count,
                avg_price: round_currency(bucket.metric(AVG_PRICE).unwrap_or(0.0)),
                avg_rating: round_rating(bucket.metric(AVG_RATING).unwrap_or(0.0)),
                in_stock_count: in_stock,
                in_stock_percentage: percentage(in_stock, bucket.doc_count),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBucketSummary {
    pub range: String,
    pub from: Option<f64>,
    pub to: Option<f64>,
    pub count: u64,
    pub avg_rating: f64,
}

pub fn shape_price_distribution(agg: Option<AggregationResult<'_>>) -> Vec<PriceBucketSummary> {
    buckets_of(agg)
        .iter()
        .map(|bucket| PriceBucketSummary {
            range: bucket.key_string(),
            from: bucket.from,
            to: bucket.to,
            count: bucket.doc_count,
            avg_rating: round_rating(bucket.metric(AVG_RATING).unwrap_or(0.0)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBucketSummary {
    pub range: String,
    pub count: u64,
    pub avg_price: f64,
}

pub fn shape_rating_distribution(agg: Option<AggregationResult<'_>>) -> Vec<RatingBucketSummary> {
    buckets_of(agg)
        .iter()
        .map(|bucket| RatingBucketSummary {
            range: bucket.key_string(),
            count: bucket.doc_count,
            avg_price: round_currency(bucket.metric(AVG_PRICE).unwrap_or(0.0)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub tag: String,
    pub count: u64,
    pub avg_price: f64,
    pub avg_rating: f64,
}

pub fn shape_tag_popularity(agg: Option<AggregationResult<'_>>) -> Vec<TagSummary> {
    buckets_of(agg)
        .iter()
        .map(|bucket| TagSummary {
            tag: bucket.key_string(),
            count: bucket.doc_count,
            avg_price: round_currency(bucket.metric(AVG_PRICE).unwrap_or(0.0)),
            avg_rating: round_rating(bucket.metric(AVG_RATING).unwrap_or(0.0)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub in_stock: bool,
    pub count: u64,
    pub percentage: u32,
    pub price: MetricSummary,
}

/// Stock split; percentages are relative to all documents in the split
pub fn shape_stock_status(agg: Option<AggregationResult<'_>>) -> Vec<StockSummary> {
    let buckets = buckets_of(agg);
    let total: u64 = buckets.iter().map(|b| b.doc_count).sum();

    buckets
        .iter()
        .map(|bucket| StockSummary {
            in_stock: bucket.key_bool(),
            count: bucket.doc_count,
            percentage: percentage(bucket.doc_count, total),
            price: shape_stats(&bucket.sub_stats(PRICE_STATS).unwrap_or_default(), round_currency),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub period: String,
    pub count: u64,
    pub avg_price: f64,
    pub avg_rating: f64,
}

pub fn shape_timeline(agg: Option<AggregationResult<'_>>) -> Vec<TimelinePoint> {
    buckets_of(agg)
        .iter()
        .map(|bucket| TimelinePoint {
            period: bucket.key_string(),
            count: bucket.doc_count,
            avg_price: round_currency(bucket.metric(AVG_PRICE).unwrap_or(0.0)),
            avg_rating: round_rating(bucket.metric(AVG_RATING).unwrap_or(0.0)),
        })
        .collect()
}

/// Rounded summary of a stats metric; bounds are absent for empty sets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: Option<f64>,
}

pub fn shape_stats(stats: &StatsAggregation, round: fn(f64) -> f64) -> MetricSummary {
    MetricSummary {
        count: stats.count,
        min: stats.min.map(round),
        max: stats.max.map(round),
        avg: stats.avg.map(round),
        sum: stats.sum.map(round),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub categories: Vec<FacetValue>,
    pub price_ranges: Vec<FacetValue>,
    pub ratings: Vec<FacetValue>,
    pub tags: Vec<FacetValue>,
    pub stock: Vec<FacetValue>,
    pub total: u64,
}

/// Facet counts from the facet aggregation set
pub fn shape_facets(response: &EngineResponse) -> Facets {
    let values = |name: &str| -> Vec<FacetValue> {
        buckets_of(response.aggregation(name))
            .iter()
            .map(|bucket| FacetValue {
                value: bucket.key_string(),
                count: bucket.doc_count,
            })
            .collect()
    };

    let stock = buckets_of(response.aggregation("stock"))
        .iter()
        .map(|bucket| FacetValue {
            value: if bucket.key_bool() { "inStock" } else { "outOfStock" }.to_string(),
            count: bucket.doc_count,
        })
        .collect();

    Facets {
        categories: values("categories"),
        price_ranges: values("price_ranges"),
        ratings: values("ratings"),
        tags: values("tags"),
        stock,
        total: response.total(),
    }
}

/// Index statistics as reported to API callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    #[serde(flatten)]
    pub index: IndexStats,
    pub size_mb: f64,
    pub avg_query_time_ms: f64,
    pub avg_index_time_ms: f64,
}

pub fn shape_index_stats(stats: IndexStats) -> StatsSummary {
    let size_mb = round_currency(stats.size_bytes as f64 / (1024.0 * 1024.0));
    let avg_query_time_ms = average(stats.search.query_time_ms, stats.search.query_total);
    let avg_index_time_ms = average(stats.indexing.index_time_ms, stats.indexing.index_total);
    StatsSummary {
        index: stats,
        size_mb,
        avg_query_time_ms,
        avg_index_time_ms,
    }
}

fn average(total_ms: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        round_currency(total_ms as f64 / count as f64)
    }
}

fn buckets_of(agg: Option<AggregationResult<'_>>) -> Vec<Bucket> {
    agg.map(|agg| agg.buckets()).unwrap_or_default()
}
