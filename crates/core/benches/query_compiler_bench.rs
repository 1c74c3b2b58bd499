//! Benchmarks for query compilation and response shaping
//!
//! Run with: cargo bench --package catalog-core --bench query_compiler_bench

use catalog_core::aggregation::builders;
use catalog_core::engine::EngineResponse;
use catalog_core::query::{compile, compile_aggregations, FilterSet, SearchRequest, SearchType};
use catalog_core::shaper::{shape_category_analytics, shape_hits};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn request(search_type: SearchType, filters: FilterSet) -> SearchRequest {
    SearchRequest {
        free_text: Some("wireless headphones".to_string()),
        search_type,
        filters,
        page: 2,
        page_size: 20,
        ..Default::default()
    }
}

fn full_filters() -> FilterSet {
    FilterSet {
        category: Some("Electronics".to_string()),
        price_min: Some(20.0),
        price_max: Some(250.0),
        rating_min: Some(4.0),
        in_stock: Some(true),
        tags: ["wireless".to_string(), "bluetooth".to_string()]
            .into_iter()
            .collect(),
    }
}

/// Compilation cost per search strategy
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for search_type in [
        SearchType::MultiMatch,
        SearchType::PhraseMatch,
        SearchType::Wildcard,
        SearchType::Fuzzy,
        SearchType::MatchAll,
    ] {
        let req = request(search_type, full_filters());
        group.bench_with_input(
            BenchmarkId::from_parameter(search_type),
            &req,
            |b, req| b.iter(|| compile(black_box(req)).to_body()),
        );
    }

    group.finish();
}

fn bench_facets(c: &mut Criterion) {
    let req = request(SearchType::MultiMatch, full_filters());
    c.bench_function("compile_facets", |b| {
        b.iter(|| compile_aggregations(black_box(&req), builders::facets()).to_body())
    });
}

fn bench_shaping(c: &mut Criterion) {
    let hits: Vec<_> = (0..50)
        .map(|i| {
            json!({
                "_id": format!("p{}", i),
                "_score": 1.0,
                "_source": {
                    "name": format!("Product {}", i),
                    "category": "Electronics",
                    "price": 10.0 + i as f64,
                    "rating": 4.2,
                    "inStock": i % 2 == 0,
                    "tags": ["wireless"]
                }
            })
        })
        .collect();
    let buckets: Vec<_> = (0..20)
        .map(|i| {
            json!({
                "key": format!("Category {}", i),
                "doc_count": 100 + i,
                "avg_price": { "value": 42.123 },
                "avg_rating": { "value": 3.87 },
                "in_stock": { "doc_count": 60 }
            })
        })
        .collect();

    let response: EngineResponse = serde_json::from_value(json!({
        "took": 3,
        "hits": { "total": { "value": 50 }, "hits": hits },
        "aggregations": { "categories": { "buckets": buckets } }
    }))
    .unwrap();

    c.bench_function("shape_hits", |b| b.iter(|| shape_hits(black_box(&response))));
    c.bench_function("shape_category_analytics", |b| {
        b.iter(|| shape_category_analytics(black_box(&response).aggregation("categories")))
    });
}

criterion_group!(benches, bench_compile, bench_facets, bench_shaping);
criterion_main!(benches);
