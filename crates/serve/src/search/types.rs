//! Search API request and response types
//!
//! Query-string and JSON parameters use the same camelCase names; both are
//! converted into a [`SearchRequest`] before compilation.

use catalog_core::aggregation::{
    AggregationName, AggregationOptions, CalendarInterval, PriceBreakpoints,
};
use catalog_core::query::{
    FilterSet, SearchRequest, SearchType, SortOrder, DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD,
};
use catalog_core::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameters for `GET /api/search` and `GET /api/search/facets`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Free text
    pub q: Option<String>,
    /// Search strategy name, unknown names mean match-all
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub in_stock: Option<bool>,
    /// Comma separated tag list
    pub tags: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl SearchParams {
    pub fn into_request(self) -> SearchRequest {
        let tags = self
            .tags
            .as_deref()
            .map(split_tags)
            .unwrap_or_default();

        SearchBody {
            q: self.q,
            search_type: self.search_type,
            category: self.category,
            min_price: self.min_price,
            max_price: self.max_price,
            min_rating: self.min_rating,
            in_stock: self.in_stock,
            tags,
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
        .into_request()
    }
}

/// JSON body for `POST /api/search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl SearchBody {
    pub fn into_request(self) -> SearchRequest {
        let category = self.category.filter(|c| !c.trim().is_empty());

        SearchRequest {
            free_text: self.q,
            search_type: self
                .search_type
                .as_deref()
                .map(SearchType::parse)
                .unwrap_or(SearchType::MultiMatch),
            filters: FilterSet {
                category,
                price_min: self.min_price,
                price_max: self.max_price,
                rating_min: self.min_rating,
                in_stock: self.in_stock,
                tags: self
                    .tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            },
            page: self.page.unwrap_or(1),
            page_size: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            sort_field: self
                .sort_by
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SORT_FIELD.to_string()),
            sort_order: self
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
        }
    }
}

fn split_tags(list: &str) -> Vec<String> {
    list.split(',').map(|t| t.trim().to_string()).collect()
}

/// Query parameters for `GET /api/analytics/price-distribution`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceDistributionParams {
    /// Comma separated breakpoints
    pub ranges: Option<String>,
}

impl PriceDistributionParams {
    pub fn breakpoints(&self) -> Result<PriceBreakpoints> {
        match self.ranges.as_deref() {
            Some(list) if !list.trim().is_empty() => PriceBreakpoints::parse(list),
            _ => Ok(PriceBreakpoints::default()),
        }
    }
}

/// Query parameters for `GET /api/analytics/tags`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagParams {
    pub size: Option<u32>,
}

/// Query parameters for `GET /api/analytics/timeline`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineParams {
    pub interval: Option<String>,
}

impl TimelineParams {
    pub fn interval(&self) -> CalendarInterval {
        self.interval
            .as_deref()
            .map(CalendarInterval::parse)
            .unwrap_or_default()
    }
}

/// Shaped buckets of one analytics view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse<T> {
    pub buckets: Vec<T>,
    /// Documents the view was computed over
    pub total: u64,
    pub took_ms: u64,
}

/// Body of `POST /api/aggregations`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    /// Optional free text narrowing the population
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    #[serde(default)]
    pub filters: FilterSet,
    /// Named aggregations to compute, in response order
    pub aggregations: Vec<AggregationName>,
    /// Price breakpoints for `priceRanges`
    pub breakpoints: Option<Vec<f64>>,
    /// Calendar interval for `timeline`
    pub interval: Option<String>,
    /// Bucket count for terms aggregations
    pub size: Option<u32>,
}

impl AggregationRequest {
    /// Population selector for the aggregation-only query
    pub fn population(&self) -> SearchRequest {
        SearchRequest {
            free_text: self.q.clone(),
            search_type: self
                .search_type
                .as_deref()
                .map(SearchType::parse)
                .unwrap_or(SearchType::MultiMatch),
            filters: self.filters.clone(),
            ..Default::default()
        }
    }

    pub fn options(&self) -> Result<AggregationOptions> {
        let breakpoints = match self.breakpoints {
            Some(ref values) => PriceBreakpoints::new(values.clone())?,
            None => PriceBreakpoints::default(),
        };
        Ok(AggregationOptions {
            breakpoints,
            interval: self
                .interval
                .as_deref()
                .map(CalendarInterval::parse)
                .unwrap_or_default(),
            size: self.size,
        })
    }
}

/// Shaped results keyed by aggregation key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResponse {
    pub aggregations: IndexMap<String, Value>,
    pub total: u64,
    pub took_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_to_request() {
        let params = SearchParams {
            q: Some("wireless".to_string()),
            search_type: Some("phraseMatch".to_string()),
            category: Some("Electronics".to_string()),
            min_price: Some(10.0),
            in_stock: Some(true),
            tags: Some("audio, ,bluetooth".to_string()),
            page: Some(3),
            limit: Some(25),
            sort_by: Some("price".to_string()),
            sort_order: Some("asc".to_string()),
            ..Default::default()
        };

        let request = params.into_request();
        assert_eq!(request.free_text.as_deref(), Some("wireless"));
        assert_eq!(request.search_type, SearchType::PhraseMatch);
        assert_eq!(request.filters.category.as_deref(), Some("Electronics"));
        assert_eq!(request.filters.price_min, Some(10.0));
        assert_eq!(request.filters.tags.len(), 2);
        assert_eq!(request.page, 3);
        assert_eq!(request.page_size, 25);
        assert_eq!(request.sort_field, "price");
        assert_eq!(request.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_params_defaults() {
        let request = SearchParams::default().into_request();
        assert_eq!(request.free_text, None);
        assert_eq!(request.search_type, SearchType::MultiMatch);
        assert_eq!(request.filters, FilterSet::default());
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.sort_field, DEFAULT_SORT_FIELD);
        assert_eq!(request.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_unknown_type_falls_back_to_match_all() {
        let body = SearchBody {
            q: Some("anything".to_string()),
            search_type: Some("semantic".to_string()),
            ..Default::default()
        };
        assert_eq!(body.into_request().search_type, SearchType::MatchAll);
    }

    #[test]
    fn test_body_deserialization() {
        let body: SearchBody = serde_json::from_str(
            r#"{"q":"lamp","type":"fuzzy","tags":["home"],"minRating":4,"limit":5}"#,
        )
        .unwrap();
        let request = body.into_request();
        assert_eq!(request.search_type, SearchType::Fuzzy);
        assert_eq!(request.filters.rating_min, Some(4.0));
        assert!(request.filters.tags.contains("home"));
        assert_eq!(request.page_size, 5);
    }

    #[test]
    fn test_price_distribution_breakpoints() {
        let params = PriceDistributionParams {
            ranges: Some("100,10,50".to_string()),
        };
        assert_eq!(params.breakpoints().unwrap().values(), &[10.0, 50.0, 100.0]);

        let defaults = PriceDistributionParams::default().breakpoints().unwrap();
        assert_eq!(defaults, PriceBreakpoints::default());

        let bad = PriceDistributionParams {
            ranges: Some("10,abc".to_string()),
        };
        assert!(bad.breakpoints().is_err());
    }

    #[test]
    fn test_aggregation_request() {
        let request: AggregationRequest = serde_json::from_str(
            r#"{
                "filters": {"category": "Books"},
                "aggregations": ["categories", "priceRanges", "priceStats"],
                "breakpoints": [20, 40],
                "interval": "week"
            }"#,
        )
        .unwrap();

        assert_eq!(request.aggregations.len(), 3);
        let options = request.options().unwrap();
        assert_eq!(options.breakpoints.values(), &[20.0, 40.0]);
        assert_eq!(options.interval, CalendarInterval::Week);
        assert_eq!(
            request.population().filters.category.as_deref(),
            Some("Books")
        );
    }

    #[test]
    fn test_aggregation_request_rejects_duplicate_breakpoints() {
        let request = AggregationRequest {
            aggregations: vec![AggregationName::PriceRanges],
            breakpoints: Some(vec![10.0, 10.0]),
            ..Default::default()
        };
        assert!(request.options().is_err());
    }
}
