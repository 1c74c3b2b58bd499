//! Search API module
//!
//! The search module is organized into:
//! - `types`: query-string and JSON request shapes, response wrappers
//! - `handlers`: search and facet endpoints
//! - `analytics`: analytics views and custom aggregations
//!
//! # Endpoints
//!
//! ```text
//! GET  /api/search?q=wireless&type=multiMatch&category=Electronics&minPrice=20
//! POST /api/search              {"q": "wireless", "tags": ["audio"], "limit": 20}
//! GET  /api/search/facets?q=wireless
//! GET  /api/analytics/price-distribution?ranges=10,50,100
//! POST /api/aggregations        {"aggregations": ["categories", "priceStats"]}
//! ```

pub mod analytics;
pub mod handlers;
pub mod types;

// Re-export commonly used types
pub use analytics::{
    handle_aggregations, handle_category_analytics, handle_price_distribution,
    handle_rating_distribution, handle_stock_status, handle_tag_popularity, handle_timeline,
};
pub use handlers::{handle_facets, handle_search, handle_search_post};
pub use types::{
    AggregationRequest, AggregationResponse, AnalyticsResponse, SearchBody, SearchParams,
};
