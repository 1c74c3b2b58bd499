//! Built-in benchmark suites

use super::harness::BenchmarkQuery;
use crate::aggregation::builders;
use crate::query::{compile, compile_aggregations, FilterSet, SearchRequest, SearchType};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Fixed suite exercising each search strategy, a filtered search and a
/// facet computation
pub fn default_suite() -> Vec<BenchmarkQuery> {
    let text = |text: &str, search_type: SearchType| SearchRequest {
        free_text: Some(text.to_string()),
        search_type,
        ..Default::default()
    };

    let filtered = SearchRequest {
        free_text: Some("wireless".to_string()),
        search_type: SearchType::MultiMatch,
        filters: FilterSet {
            category: Some("Electronics".to_string()),
            price_min: Some(20.0),
            price_max: Some(200.0),
            in_stock: Some(true),
            ..Default::default()
        },
        ..Default::default()
    };

    vec![
        BenchmarkQuery::new("match_all", compile(&SearchRequest::default())),
        BenchmarkQuery::new(
            "multi_match",
            compile(&text("wireless headphones", SearchType::MultiMatch)),
        ),
        BenchmarkQuery::new(
            "phrase_match",
            compile(&text("gaming mouse", SearchType::PhraseMatch)),
        ),
        BenchmarkQuery::new("wildcard", compile(&text("phone", SearchType::Wildcard))),
        BenchmarkQuery::new("fuzzy", compile(&text("keybord", SearchType::Fuzzy))),
        BenchmarkQuery::new("filtered_search", compile(&filtered)),
        BenchmarkQuery::new(
            "facets",
            compile_aggregations(&SearchRequest::default(), builders::facets()),
        ),
    ]
}

/// A caller supplied, named search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScript {
    pub name: String,
    #[serde(flatten)]
    pub request: SearchRequest,
}

/// Compiles caller scripts into benchmark queries
///
/// # Errors
///
/// Returns `CatalogError::Validation` for an empty list, an unnamed script or
/// a request that fails validation
pub fn compile_scripts(scripts: &[TestScript], max_page_size: u32) -> Result<Vec<BenchmarkQuery>> {
    if scripts.is_empty() {
        return Err(crate::CatalogError::validation(
            "at least one test script is required",
        ));
    }

    scripts
        .iter()
        .map(|script| {
            if script.name.trim().is_empty() {
                return Err(crate::CatalogError::validation("test script name is required"));
            }
            script.request.validate(max_page_size)?;
            Ok(BenchmarkQuery::new(script.name.clone(), compile(&script.request)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Clause;
    use serde_json::json;

    #[test]
    fn test_default_suite_shape() {
        let suite = default_suite();
        let names: Vec<&str> = suite.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "match_all",
                "multi_match",
                "phrase_match",
                "wildcard",
                "fuzzy",
                "filtered_search",
                "facets"
            ]
        );
        assert_eq!(suite[0].query.root(), &Clause::MatchAll);
        assert_eq!(suite[5].query.root().kind(), "bool");
        assert!(suite[6].query.is_aggregation_only());
    }

    #[test]
    fn test_compile_scripts() {
        let scripts: Vec<TestScript> = serde_json::from_value(json!([
            { "name": "cheap mice", "freeText": "mouse", "searchType": "multiMatch",
              "filters": { "priceMax": 30 } },
            { "name": "everything" }
        ]))
        .unwrap();

        let queries = compile_scripts(&scripts, 100).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].name, "cheap mice");
        assert_eq!(queries[0].query.root().kind(), "bool");
        assert_eq!(queries[1].query.root(), &Clause::MatchAll);
    }

    #[test]
    fn test_compile_scripts_rejects_bad_input() {
        assert!(compile_scripts(&[], 100).is_err());

        let unnamed: Vec<TestScript> =
            serde_json::from_value(json!([{ "name": " " }])).unwrap();
        assert!(compile_scripts(&unnamed, 100).is_err());

        let bad_page: Vec<TestScript> =
            serde_json::from_value(json!([{ "name": "x", "page": 0 }])).unwrap();
        assert!(compile_scripts(&bad_page, 100).is_err());
    }
}
