//! End-to-end tests over the public compile, shape and benchmark API

use async_trait::async_trait;
use catalog_core::bench::{default_suite, ManualClock};
use catalog_core::engine::{BulkIndexReport, IndexStats};
use catalog_core::shaper::shape_facets;
use catalog_core::{
    builders, compile, compile_aggregations, BenchmarkHarness, BenchmarkOptions, BenchmarkReport,
    CatalogError, CompiledQuery, EngineResponse, FilterSet, Product, Result, SearchEngine,
    SearchPage, SearchRequest, SearchType,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Engine that answers every search with the same canned response and
/// fails every `fail_every`-th call
struct CannedEngine {
    response: Value,
    fail_every: Option<usize>,
    calls: AtomicUsize,
}

impl CannedEngine {
    fn new(response: Value) -> Self {
        Self {
            response,
            fail_every: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchEngine for CannedEngine {
    async fn execute(&self, _query: &CompiledQuery) -> Result<EngineResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.fail_every, Some(n) if call % n == 0) {
            return Err(CatalogError::engine("shard failure"));
        }
        Ok(serde_json::from_value(self.response.clone())?)
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
        Ok(true)
    }
}

fn search_response() -> Value {
    json!({
        "took": 7,
        "hits": {
            "total": { "value": 25, "relation": "eq" },
            "hits": [
                {
                    "_id": "p-1",
                    "_score": 3.2,
                    "_source": {
                        "name": "Wireless Headphones",
                        "category": "Electronics",
                        "price": 89.99,
                        "rating": 4.5,
                        "inStock": true,
                        "tags": ["wireless", "audio"]
                    }
                },
                {
                    "_id": "p-2",
                    "_score": 1.0,
                    "_source": { "broken": true }
                }
            ]
        }
    })
}

#[test]
fn test_filtered_search_compiles_and_shapes() {
    let request = SearchRequest {
        free_text: Some("wireless".to_string()),
        search_type: SearchType::MultiMatch,
        filters: FilterSet {
            category: Some("Electronics".to_string()),
            in_stock: Some(true),
            ..Default::default()
        },
        page: 3,
        page_size: 10,
        ..Default::default()
    };
    request.validate(100).unwrap();

    let body = compile(&request).to_body();
    assert_eq!(body["from"], 20);
    assert_eq!(body["size"], 10);
    assert_eq!(body["track_total_hits"], true);
    assert!(body["query"]["bool"]["must"][0]["multi_match"].is_object());
    assert_eq!(body["query"]["bool"]["filter"].as_array().unwrap().len(), 2);

    let response: EngineResponse = serde_json::from_value(search_response()).unwrap();
    let page = SearchPage::from_response(&response, &request);

    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.took_ms, 7);
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].product.id, "p-1");
    assert_eq!(page.products[0].score, Some(3.2));
}

#[test]
fn test_blank_text_searches_everything() {
    let request = SearchRequest {
        free_text: Some("   ".to_string()),
        search_type: SearchType::Fuzzy,
        ..Default::default()
    };

    let body = compile(&request).to_body();
    assert!(body["query"]["match_all"].is_object());
}

#[test]
fn test_facet_query_is_aggregation_only() {
    let query = compile_aggregations(&SearchRequest::default(), builders::facets());
    assert!(query.is_aggregation_only());

    let body = query.to_body();
    assert_eq!(body["size"], 0);
    let names: Vec<&String> = body["aggs"].as_object().unwrap().keys().collect();
    assert_eq!(
        names,
        vec!["categories", "price_ranges", "ratings", "tags", "stock"]
    );

    let response: EngineResponse = serde_json::from_value(json!({
        "took": 2,
        "hits": { "total": 12, "hits": [] },
        "aggregations": {
            "categories": { "buckets": [{ "key": "Electronics", "doc_count": 8 }] },
            "stock": { "buckets": [
                { "key": 1, "key_as_string": "true", "doc_count": 9 },
                { "key": 0, "key_as_string": "false", "doc_count": 3 }
            ] }
        }
    }))
    .unwrap();

    let facets = shape_facets(&response);
    assert_eq!(facets.total, 12);
    assert_eq!(facets.categories[0].value, "Electronics");
    assert_eq!(facets.stock[0].value, "inStock");
    assert_eq!(facets.stock[1].count, 3);
    assert!(facets.tags.is_empty());
}

#[tokio::test]
async fn test_default_suite_benchmark_report() {
    let engine = Arc::new(CannedEngine::new(search_response()));
    let harness = BenchmarkHarness::new(
        engine.clone(),
        Arc::new(ManualClock::new(Duration::from_millis(2))),
    );

    let options = BenchmarkOptions {
        iterations: 3,
        concurrency: 2,
        overall_timeout: None,
    };
    let run = harness.run(default_suite(), options).await.unwrap();
    let report = BenchmarkReport::from_run(run, false);

    assert_eq!(engine.calls.load(Ordering::SeqCst), 21);
    assert_eq!(report.overall.count, 21);
    assert_eq!(report.overall.success_count, 21);
    assert_eq!(report.overall.success_rate, 100.0);
    assert_eq!(report.per_query.len(), 7);
    assert_eq!(report.per_query[0].query_name, "match_all");
    assert!(report.run.is_none());
}

#[tokio::test]
async fn test_failures_are_recorded_not_raised() {
    let engine = Arc::new(CannedEngine {
        fail_every: Some(2),
        ..CannedEngine::new(search_response())
    });
    let harness = BenchmarkHarness::new(
        engine,
        Arc::new(ManualClock::new(Duration::from_millis(1))),
    );

    let options = BenchmarkOptions {
        iterations: 4,
        concurrency: 1,
        overall_timeout: None,
    };
    let run = harness
        .run(default_suite()[..1].to_vec(), options)
        .await
        .unwrap();
    let report = BenchmarkReport::from_run(run, true);

    assert_eq!(report.overall.count, 4);
    assert_eq!(report.overall.success_count, 2);
    assert_eq!(report.overall.success_rate, 50.0);
    assert!(report.run.is_some());
}
