//! Aggregation spec builder
//!
//! Bucket aggregations (terms, range, date histogram, filter) may nest further
//! aggregations; metric aggregations are always leaves. The split is encoded
//! in [`AggregationSpec`] so a metric can never carry children.
//!
//! Range specs are validated when they are constructed: boundaries must be
//! non-decreasing in declaration order and bucket keys must be unique.

use crate::query::{Clause, SortOrder};
use crate::{CatalogError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Sub-aggregation holding the average price of a bucket
pub const AVG_PRICE: &str = "avg_price";
/// Sub-aggregation holding the average rating of a bucket
pub const AVG_RATING: &str = "avg_rating";
/// Filtered sub-count of in-stock documents
pub const IN_STOCK: &str = "in_stock";
/// Price statistics metric
pub const PRICE_STATS: &str = "price_stats";
/// Rating statistics metric
pub const RATING_STATS: &str = "rating_stats";

/// Default number of terms buckets
pub const DEFAULT_TERMS_SIZE: u32 = 20;

/// Upper bound of the last rating bucket, so that a 5.0 rating is counted
const RATING_CEILING: f64 = 5.01;

/// Calendar interval for date histograms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum CalendarInterval {
    Day,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl CalendarInterval {
    /// Parses an interval name; unknown names fall back to month
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "day" | "1d" | "daily" => Self::Day,
            "week" | "1w" | "weekly" => Self::Week,
            "quarter" | "1q" | "quarterly" => Self::Quarter,
            "year" | "1y" | "yearly" => Self::Year,
            _ => Self::Month,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }
}

impl From<String> for CalendarInterval {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

/// One bucket of a range aggregation, `from` inclusive and `to` exclusive
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBucket {
    pub key: String,
    pub from: Option<f64>,
    pub to: Option<f64>,
}

impl RangeBucket {
    pub fn new(key: impl Into<String>, from: Option<f64>, to: Option<f64>) -> Self {
        Self {
            key: key.into(),
            from,
            to,
        }
    }

    fn to_json(&self) -> Value {
        let mut bucket = Map::new();
        bucket.insert("key".to_string(), json!(self.key));
        if let Some(from) = self.from {
            bucket.insert("from".to_string(), json!(from));
        }
        if let Some(to) = self.to {
            bucket.insert("to".to_string(), json!(to));
        }
        Value::Object(bucket)
    }
}

/// Ordering of terms buckets
#[derive(Debug, Clone, PartialEq)]
pub struct TermsOrder {
    /// `_count`, `_key` or the name of a metric sub-aggregation
    pub by: String,
    pub direction: SortOrder,
}

impl TermsOrder {
    pub fn new(by: &str, direction: SortOrder) -> Self {
        Self {
            by: by.to_string(),
            direction,
        }
    }
}

/// Kinds of bucket aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum BucketKind {
    Terms {
        field: String,
        size: u32,
        order: Option<TermsOrder>,
    },
    Range {
        field: String,
        ranges: Vec<RangeBucket>,
    },
    DateHistogram {
        field: String,
        interval: CalendarInterval,
    },
    Filter {
        clause: Clause,
    },
}

/// A bucket aggregation and its nested children
#[derive(Debug, Clone, PartialEq)]
pub struct BucketAggregation {
    pub kind: BucketKind,
    pub sub_aggregations: IndexMap<String, AggregationSpec>,
}

impl BucketAggregation {
    fn of(kind: BucketKind) -> Self {
        Self {
            kind,
            sub_aggregations: IndexMap::new(),
        }
    }

    /// Terms buckets on an exact-value field
    pub fn terms(field: &str, size: u32) -> Self {
        Self::of(BucketKind::Terms {
            field: field.to_string(),
            size,
            order: None,
        })
    }

    /// Range buckets over a numeric field
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` when the list is empty, a bound is
    /// not finite, boundaries decrease, or two buckets share a key
    pub fn range(field: &str, ranges: Vec<RangeBucket>) -> Result<Self> {
        validate_ranges(&ranges)?;
        Ok(Self::of(BucketKind::Range {
            field: field.to_string(),
            ranges,
        }))
    }

    /// Calendar date histogram
    pub fn date_histogram(field: &str, interval: CalendarInterval) -> Self {
        Self::of(BucketKind::DateHistogram {
            field: field.to_string(),
            interval,
        })
    }

    /// Single bucket holding documents that match `clause`
    pub fn filter(clause: Clause) -> Self {
        Self::of(BucketKind::Filter { clause })
    }

    /// Sets the terms ordering; ignored for other kinds
    pub fn ordered_by(mut self, order: TermsOrder) -> Self {
        if let BucketKind::Terms { order: ref mut slot, .. } = self.kind {
            *slot = Some(order);
        }
        self
    }

    /// Adds a nested aggregation
    pub fn with_sub(mut self, name: &str, spec: impl Into<AggregationSpec>) -> Self {
        self.sub_aggregations.insert(name.to_string(), spec.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut node = Map::new();
        let (key, body) = match &self.kind {
            BucketKind::Terms { field, size, order } => {
                let mut body = json!({ "field": field, "size": size });
                if let Some(order) = order {
                    body["order"] = json!({ order.by.as_str(): order.direction.to_string() });
                }
                ("terms", body)
            }
            BucketKind::Range { field, ranges } => (
                "range",
                json!({
                    "field": field,
                    "ranges": ranges.iter().map(RangeBucket::to_json).collect::<Vec<_>>(),
                }),
            ),
            BucketKind::DateHistogram { field, interval } => (
                "date_histogram",
                json!({
                    "field": field,
                    "calendar_interval": interval.as_str(),
                    "min_doc_count": 0,
                }),
            ),
            BucketKind::Filter { clause } => ("filter", clause.to_json()),
        };
        node.insert(key.to_string(), body);

        if !self.sub_aggregations.is_empty() {
            node.insert("aggs".to_string(), render_map(&self.sub_aggregations));
        }
        Value::Object(node)
    }
}

/// Leaf metric aggregations
#[derive(Debug, Clone, PartialEq)]
pub enum MetricAggregation {
    Stats { field: String },
    Avg { field: String },
    Min { field: String },
    Max { field: String },
    Sum { field: String },
}

impl MetricAggregation {
    fn to_json(&self) -> Value {
        let (key, field) = match self {
            Self::Stats { field } => ("stats", field),
            Self::Avg { field } => ("avg", field),
            Self::Min { field } => ("min", field),
            Self::Max { field } => ("max", field),
            Self::Sum { field } => ("sum", field),
        };
        json!({ key: { "field": field } })
    }
}

/// A named node of an aggregation tree
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationSpec {
    Bucket(BucketAggregation),
    Metric(MetricAggregation),
}

impl AggregationSpec {
    /// Validated range aggregation, see [`BucketAggregation::range`]
    pub fn range(field: &str, ranges: Vec<RangeBucket>) -> Result<Self> {
        BucketAggregation::range(field, ranges).map(Self::Bucket)
    }

    pub fn stats(field: &str) -> Self {
        Self::Metric(MetricAggregation::Stats {
            field: field.to_string(),
        })
    }

    pub fn avg(field: &str) -> Self {
        Self::Metric(MetricAggregation::Avg {
            field: field.to_string(),
        })
    }

    pub fn min(field: &str) -> Self {
        Self::Metric(MetricAggregation::Min {
            field: field.to_string(),
        })
    }

    pub fn max(field: &str) -> Self {
        Self::Metric(MetricAggregation::Max {
            field: field.to_string(),
        })
    }

    pub fn sum(field: &str) -> Self {
        Self::Metric(MetricAggregation::Sum {
            field: field.to_string(),
        })
    }

    /// Nested aggregations; always empty for metrics
    pub fn sub_aggregations(&self) -> Option<&IndexMap<String, AggregationSpec>> {
        match self {
            Self::Bucket(bucket) => Some(&bucket.sub_aggregations),
            Self::Metric(_) => None,
        }
    }

    /// Render as engine aggregation DSL
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bucket(bucket) => bucket.to_json(),
            Self::Metric(metric) => metric.to_json(),
        }
    }
}

impl From<BucketAggregation> for AggregationSpec {
    fn from(bucket: BucketAggregation) -> Self {
        Self::Bucket(bucket)
    }
}

impl From<MetricAggregation> for AggregationSpec {
    fn from(metric: MetricAggregation) -> Self {
        Self::Metric(metric)
    }
}

impl Serialize for AggregationSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn render_map(specs: &IndexMap<String, AggregationSpec>) -> Value {
    Value::Object(
        specs
            .iter()
            .map(|(name, spec)| (name.clone(), spec.to_json()))
            .collect(),
    )
}

fn validate_ranges(ranges: &[RangeBucket]) -> Result<()> {
    if ranges.is_empty() {
        return Err(CatalogError::validation(
            "range aggregation needs at least one bucket",
        ));
    }

    let mut keys = HashSet::with_capacity(ranges.len());
    let mut last: Option<f64> = None;

    for bucket in ranges {
        if !keys.insert(bucket.key.as_str()) {
            return Err(CatalogError::validation(format!(
                "duplicate range bucket key '{}'",
                bucket.key
            )));
        }

        for bound in [bucket.from, bucket.to].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(CatalogError::validation(format!(
                    "range bucket '{}' has a non-finite bound",
                    bucket.key
                )));
            }
            if let Some(previous) = last {
                if bound < previous {
                    return Err(CatalogError::validation(format!(
                        "range boundaries must be non-decreasing at bucket '{}'",
                        bucket.key
                    )));
                }
            }
            last = Some(bound);
        }
    }

    Ok(())
}

/// Strictly increasing price breakpoints for price-distribution buckets
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakpoints(Vec<f64>);

impl Default for PriceBreakpoints {
    fn default() -> Self {
        Self(vec![25.0, 50.0, 100.0, 200.0, 500.0])
    }
}

impl PriceBreakpoints {
    /// Builds breakpoints from values in any order
    ///
    /// Values are sorted ascending and must then be strictly increasing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an empty list, a negative or
    /// non-finite value, or a repeated value
    pub fn new(mut values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(CatalogError::validation(
                "at least one price breakpoint is required",
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(CatalogError::validation(format!(
                "invalid price breakpoint {}",
                bad
            )));
        }

        values.sort_by(f64::total_cmp);
        if let Some(pair) = values.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(CatalogError::validation(format!(
                "price breakpoints must be strictly increasing, {} is repeated",
                format_amount(pair[1])
            )));
        }

        Ok(Self(values))
    }

    /// Parses a comma separated list such as `10,50,100`
    pub fn parse(list: &str) -> Result<Self> {
        let values = list
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f64>().map_err(|_| {
                    CatalogError::validation(format!("invalid price breakpoint '{}'", part))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::new(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// N breakpoints produce N+1 labelled buckets
    pub fn buckets(&self) -> Vec<RangeBucket> {
        let points = &self.0;
        let mut buckets = Vec::with_capacity(points.len() + 1);

        if let Some(&first) = points.first() {
            buckets.push(RangeBucket::new(
                format!("Under ${}", format_amount(first)),
                None,
                Some(first),
            ));
        }
        for pair in points.windows(2) {
            buckets.push(RangeBucket::new(
                format!("${} - ${}", format_amount(pair[0]), format_amount(pair[1])),
                Some(pair[0]),
                Some(pair[1]),
            ));
        }
        if let Some(&last) = points.last() {
            buckets.push(RangeBucket::new(
                format!("Over ${}", format_amount(last)),
                Some(last),
                None,
            ));
        }

        buckets
    }
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Named aggregations offered by the custom aggregation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationName {
    Categories,
    PriceRanges,
    Ratings,
    Tags,
    Stock,
    Timeline,
    PriceStats,
    RatingStats,
}

/// Parameters shared by the named aggregation builders
#[derive(Debug, Clone, Default)]
pub struct AggregationOptions {
    pub breakpoints: PriceBreakpoints,
    pub interval: CalendarInterval,
    pub size: Option<u32>,
}

impl AggregationName {
    /// Key under which the aggregation is requested and returned
    pub fn key(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::PriceRanges => "price_ranges",
            Self::Ratings => "ratings",
            Self::Tags => "tags",
            Self::Stock => "stock",
            Self::Timeline => "timeline",
            Self::PriceStats => PRICE_STATS,
            Self::RatingStats => RATING_STATS,
        }
    }

    pub fn build(self, options: &AggregationOptions) -> AggregationSpec {
        let size = options.size.unwrap_or(DEFAULT_TERMS_SIZE);
        match self {
            Self::Categories => builders::category_counts(size),
            Self::PriceRanges => builders::price_ranges(&options.breakpoints),
            Self::Ratings => builders::rating_ranges(),
            Self::Tags => builders::tag_popularity(size),
            Self::Stock => builders::stock_split(),
            Self::Timeline => builders::date_histogram("createdAt", options.interval),
            Self::PriceStats => builders::price_stats(),
            Self::RatingStats => builders::rating_stats(),
        }
    }
}

/// Prebuilt aggregation trees used by the analytics and facet endpoints
pub mod builders {
    use super::*;
    use crate::query::filter::{CATEGORY_FIELD, PRICE_FIELD, RATING_FIELD, STOCK_FIELD, TAGS_FIELD};

    /// Per-category counts with average price, average rating and in-stock count
    pub fn category_counts(size: u32) -> AggregationSpec {
        BucketAggregation::terms(CATEGORY_FIELD, size)
            .with_sub(AVG_PRICE, AggregationSpec::avg(PRICE_FIELD))
            .with_sub(AVG_RATING, AggregationSpec::avg(RATING_FIELD))
            .with_sub(
                IN_STOCK,
                BucketAggregation::filter(Clause::term_bool(STOCK_FIELD, true)),
            )
            .into()
    }

    /// Price buckets derived from breakpoints, each with its average rating
    pub fn price_ranges(breakpoints: &PriceBreakpoints) -> AggregationSpec {
        // Breakpoints are strictly increasing with unique labels by construction.
        BucketAggregation::of(BucketKind::Range {
            field: PRICE_FIELD.to_string(),
            ranges: breakpoints.buckets(),
        })
        .with_sub(AVG_RATING, AggregationSpec::avg(RATING_FIELD))
        .into()
    }

    /// Whole-star rating buckets with their average price
    pub fn rating_ranges() -> AggregationSpec {
        let ranges = (0..5)
            .map(|star| {
                let from = f64::from(star);
                let to = if star == 4 { RATING_CEILING } else { from + 1.0 };
                RangeBucket::new(format!("{}-{}", star, star + 1), Some(from), Some(to))
            })
            .collect();

        BucketAggregation::of(BucketKind::Range {
            field: RATING_FIELD.to_string(),
            ranges,
        })
        .with_sub(AVG_PRICE, AggregationSpec::avg(PRICE_FIELD))
        .into()
    }

    /// Most used tags with average price and rating
    pub fn tag_popularity(size: u32) -> AggregationSpec {
        BucketAggregation::terms(TAGS_FIELD, size)
            .with_sub(AVG_PRICE, AggregationSpec::avg(PRICE_FIELD))
            .with_sub(AVG_RATING, AggregationSpec::avg(RATING_FIELD))
            .into()
    }

    /// In-stock versus out-of-stock split with price statistics
    pub fn stock_split() -> AggregationSpec {
        BucketAggregation::terms(STOCK_FIELD, 2)
            .with_sub(PRICE_STATS, AggregationSpec::stats(PRICE_FIELD))
            .into()
    }

    /// Date histogram with average price and rating per period
    pub fn date_histogram(field: &str, interval: CalendarInterval) -> AggregationSpec {
        BucketAggregation::date_histogram(field, interval)
            .with_sub(AVG_PRICE, AggregationSpec::avg(PRICE_FIELD))
            .with_sub(AVG_RATING, AggregationSpec::avg(RATING_FIELD))
            .into()
    }

    pub fn price_stats() -> AggregationSpec {
        AggregationSpec::stats(PRICE_FIELD)
    }

    pub fn rating_stats() -> AggregationSpec {
        AggregationSpec::stats(RATING_FIELD)
    }

    /// Facet counts for the facet endpoint
    pub fn facets() -> IndexMap<String, AggregationSpec> {
        let mut facets = IndexMap::new();
        facets.insert(
            "categories".to_string(),
            BucketAggregation::terms(CATEGORY_FIELD, DEFAULT_TERMS_SIZE).into(),
        );
        facets.insert(
            "price_ranges".to_string(),
            price_ranges(&PriceBreakpoints::default()),
        );
        facets.insert("ratings".to_string(), rating_ranges());
        facets.insert(
            "tags".to_string(),
            BucketAggregation::terms(TAGS_FIELD, DEFAULT_TERMS_SIZE).into(),
        );
        facets.insert(
            "stock".to_string(),
            BucketAggregation::terms(STOCK_FIELD, 2).into(),
        );
        facets
    }
}
