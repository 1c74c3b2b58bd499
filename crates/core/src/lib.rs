//! Catalog Search Core Library
//!
//! Core functionality for the product catalog search service: compiling
//! search requests into engine queries, building aggregation trees, shaping
//! engine responses and benchmarking query latency.

pub mod aggregation;
pub mod bench;
pub mod config;
pub mod engine;
pub mod error;
pub mod query;
pub mod shaper;
pub mod types;

// Re-export commonly used types
pub use aggregation::{
    builders, AggregationName, AggregationOptions, AggregationSpec, BucketAggregation,
    CalendarInterval, PriceBreakpoints, RangeBucket,
};
pub use bench::{
    BenchmarkHarness, BenchmarkOptions, BenchmarkQuery, BenchmarkReport, BenchmarkRun,
    CallResult, Clock, Statistics, SystemClock, TestScript,
};
pub use config::CatalogConfig;
pub use engine::{BulkIndexReport, BulkItemResult, EngineResponse, IndexStats, SearchEngine};
pub use error::{CatalogError, ErrorCategory, Result};
pub use query::{
    compile, compile_aggregations, Clause, CompiledQuery, FilterSet, QueryBuilder,
    SearchRequest, SearchType, SortOrder,
};
pub use shaper::{SearchPage, ProductHit};
pub use types::{Product, ProductId, RunId};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version info as a formatted string
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
