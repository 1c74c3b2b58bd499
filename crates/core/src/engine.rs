//! Search engine abstraction
//!
//! [`SearchEngine`] is the capability the catalog needs from the document
//! store. Responses are modelled on the Elasticsearch search API; aggregation
//! bucket trees stay as raw JSON until a shaper asks for a specific node.

use crate::query::CompiledQuery;
use crate::types::Product;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document search engine client
///
/// Implementations must tolerate concurrent calls through a shared reference.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Run a compiled query
    async fn execute(&self, query: &CompiledQuery) -> Result<EngineResponse>;

    /// Fetch one product, `None` when the id is absent
    async fn get_by_id(&self, id: &str) -> Result<Option<Product>>;

    /// Index or replace one product
    async fn index_one(&self, product: &Product) -> Result<()>;

    /// Index many products; per-item failures are reported, not raised
    async fn index_bulk(&self, products: &[Product]) -> Result<BulkIndexReport>;

    /// Apply a partial document, `false` when the id is absent
    async fn update_by_id(&self, id: &str, changes: &Value) -> Result<bool>;

    /// Delete one product, `false` when the id is absent
    async fn delete_by_id(&self, id: &str) -> Result<bool>;

    /// Index level statistics
    async fn stats(&self) -> Result<IndexStats>;

    /// Whether the engine is reachable and serving
    async fn health(&self) -> Result<bool>;
}

/// Raw search response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineResponse {
    /// Engine-side processing time in milliseconds
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: HitList,
    #[serde(default)]
    pub aggregations: Map<String, Value>,
}

impl EngineResponse {
    pub fn took_ms(&self) -> u64 {
        self.took
    }

    /// Total number of matching documents
    pub fn total(&self) -> u64 {
        self.hits.total.value()
    }

    /// Named top-level aggregation result
    pub fn aggregation(&self, name: &str) -> Option<AggregationResult<'_>> {
        self.aggregations.get(name).map(AggregationResult::new)
    }
}

/// Hit section of a search response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitList {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// Total hit count, either a bare number or `{ "value": n, "relation": .. }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Tracked {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
}

impl Default for TotalHits {
    fn default() -> Self {
        Self::Count(0)
    }
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            Self::Tracked { value, .. } => *value,
        }
    }
}

/// A single matching document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Borrowed view over one aggregation node
#[derive(Debug, Clone, Copy)]
pub struct AggregationResult<'a> {
    raw: &'a Value,
}

impl<'a> AggregationResult<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    /// Buckets of a bucket aggregation
    ///
    /// Both the array and the keyed object forms are accepted; keyed buckets
    /// get their key copied into the bucket. Malformed buckets are skipped.
    pub fn buckets(&self) -> Vec<Bucket> {
        match self.raw.get("buckets") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| Bucket::deserialize(item).ok())
                .collect(),
            Some(Value::Object(keyed)) => keyed
                .iter()
                .filter_map(|(key, item)| {
                    let mut bucket = Bucket::deserialize(item).ok()?;
                    if bucket.key.is_null() {
                        bucket.key = Value::String(key.clone());
                    }
                    Some(bucket)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Single-value metric (`avg`, `min`, `max`, `sum`)
    pub fn value(&self) -> Option<f64> {
        self.raw.get("value").and_then(Value::as_f64)
    }

    /// Document count of a single-bucket aggregation (`filter`)
    pub fn doc_count(&self) -> u64 {
        self.raw
            .get("doc_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Stats metric
    pub fn stats(&self) -> Option<StatsAggregation> {
        StatsAggregation::deserialize(self.raw).ok()
    }
}

/// One bucket of a bucket aggregation, with its nested results
#[derive(Debug, Clone, Deserialize)]
pub struct Bucket {
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub key_as_string: Option<String>,
    #[serde(default)]
    pub doc_count: u64,
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
    #[serde(flatten)]
    pub sub_aggregations: Map<String, Value>,
}

impl Bucket {
    /// Bucket key as display text
    pub fn key_string(&self) -> String {
        if let Some(ref text) = self.key_as_string {
            return text.clone();
        }
        match &self.key {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Interprets the key of a boolean terms bucket
    pub fn key_bool(&self) -> bool {
        match &self.key {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_i64() == Some(1),
            _ => self
                .key_as_string
                .as_deref()
                .or_else(|| self.key.as_str())
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Nested aggregation result
    pub fn sub(&self, name: &str) -> Option<AggregationResult<'_>> {
        self.sub_aggregations.get(name).map(AggregationResult::new)
    }

    /// Value of a nested single-value metric
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.sub(name).and_then(|agg| agg.value())
    }

    /// Document count of a nested filter aggregation
    pub fn sub_doc_count(&self, name: &str) -> u64 {
        self.sub(name).map(|agg| agg.doc_count()).unwrap_or(0)
    }

    /// Nested stats metric
    pub fn sub_stats(&self, name: &str) -> Option<StatsAggregation> {
        self.sub(name).and_then(|agg| agg.stats())
    }
}

/// Result of a `stats` metric; all but `count` are null for empty sets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsAggregation {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub avg: Option<f64>,
    #[serde(default)]
    pub sum: Option<f64>,
}

/// Outcome of a bulk index request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkIndexReport {
    pub error_count: usize,
    pub items: Vec<BulkItemResult>,
}

impl BulkIndexReport {
    /// Builds a report, counting failed items
    pub fn from_items(items: Vec<BulkItemResult>) -> Self {
        let error_count = items.iter().filter(|item| !item.success).count();
        Self { error_count, items }
    }

    pub fn indexed_count(&self) -> usize {
        self.items.len() - self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

/// Per-document outcome of a bulk request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResult {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub doc_count: u64,
    pub size_bytes: u64,
    pub shards: ShardCounts,
    pub search: SearchTimings,
    pub indexing: IndexTimings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardCounts {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTimings {
    pub query_total: u64,
    pub query_time_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexTimings {
    pub index_total: u64,
    pub index_time_ms: u64,
}
