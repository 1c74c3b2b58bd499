//! Query tree compiler
//!
//! Composes a primary match clause, chosen by [`SearchType`], with the filter
//! clauses of a [`FilterSet`] and optional aggregations into an immutable
//! [`CompiledQuery`].
//!
//! # Examples
//!
//! ```
//! use catalog_core::query::{compile, FilterSet, SearchRequest, SearchType};
//!
//! let request = SearchRequest {
//!     free_text: Some("wireless".to_string()),
//!     search_type: SearchType::MultiMatch,
//!     filters: FilterSet {
//!         category: Some("Electronics".to_string()),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let compiled = compile(&request);
//! assert_eq!(compiled.from(), Some(0));
//! assert_eq!(compiled.size(), Some(10));
//! ```

use super::clause::{BoolClause, BoostedField, Clause, Fuzziness};
use super::filter::{build_filter_clauses, FilterSet};
use crate::aggregation::AggregationSpec;
use crate::{CatalogError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Default page size when the caller does not supply one
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Default sort field
pub const DEFAULT_SORT_FIELD: &str = "createdAt";
/// Slop allowed between phrase terms
pub const PHRASE_SLOP: u32 = 2;
/// Maximum edits for fuzzy name matching
pub const FUZZY_EDITS: u8 = 2;

/// Search strategy for the primary match clause
///
/// Unrecognized names deserialize to [`SearchType::MatchAll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "camelCase")]
pub enum SearchType {
    MultiMatch,
    PhraseMatch,
    Wildcard,
    Fuzzy,
    #[default]
    MatchAll,
}

impl SearchType {
    /// Parses a search type name, falling back to match-all
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "multimatch" | "multi" => Self::MultiMatch,
            "phrasematch" | "phrase" | "matchphrase" => Self::PhraseMatch,
            "wildcard" => Self::Wildcard,
            "fuzzy" => Self::Fuzzy,
            _ => Self::MatchAll,
        }
    }

    /// Builds the primary match clause for this strategy
    ///
    /// Blank or absent text always compiles to match-all.
    pub fn primary_clause(self, text: Option<&str>) -> Clause {
        let text = match text.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Clause::MatchAll,
        };

        match self {
            Self::MultiMatch => multi_match(text),
            Self::PhraseMatch => phrase_match(text),
            Self::Wildcard => wildcard(text),
            Self::Fuzzy => fuzzy(text),
            Self::MatchAll => Clause::MatchAll,
        }
    }
}

impl From<String> for SearchType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultiMatch => write!(f, "multiMatch"),
            Self::PhraseMatch => write!(f, "phraseMatch"),
            Self::Wildcard => write!(f, "wildcard"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::MatchAll => write!(f, "matchAll"),
        }
    }
}

fn multi_match(text: &str) -> Clause {
    Clause::MultiMatch {
        query: text.to_string(),
        fields: vec![
            BoostedField::boosted("name", 3.0),
            BoostedField::boosted("description", 2.0),
            BoostedField::plain("category"),
            BoostedField::plain("tags"),
        ],
        fuzziness: Some(Fuzziness::Auto),
    }
}

fn phrase_match(text: &str) -> Clause {
    Clause::MatchPhrase {
        field: "name".to_string(),
        query: text.to_string(),
        slop: PHRASE_SLOP,
    }
}

fn wildcard(text: &str) -> Clause {
    Clause::Wildcard {
        field: "name.keyword".to_string(),
        value: format!("*{}*", escape_wildcard(&text.to_lowercase())),
        case_insensitive: true,
    }
}

/// Escapes the wildcard metacharacters so the text matches literally
fn escape_wildcard(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '?') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn fuzzy(text: &str) -> Clause {
    Clause::Fuzzy {
        field: "name".to_string(),
        value: text.to_lowercase(),
        fuzziness: Fuzziness::Edits(FUZZY_EDITS),
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parses a sort order, anything but `asc` sorts descending
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-field sort specification
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    /// Creates a sort on the index field backing `field`
    ///
    /// Text fields are sorted through their keyword sub-field.
    pub fn new(field: &str, order: SortOrder) -> Self {
        let field = match field {
            "name" | "category" | "description" => format!("{}.keyword", field),
            other => other.to_string(),
        };
        Self { field, order }
    }

    fn to_json(&self) -> Value {
        json!([{ self.field.as_str(): { "order": self.order.as_str() } }])
    }
}

/// User-facing search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free text, absent or blank means match everything
    #[serde(default)]
    pub free_text: Option<String>,
    /// Strategy for the primary match
    #[serde(default)]
    pub search_type: SearchType,
    /// Structured filters
    #[serde(default)]
    pub filters: FilterSet,
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    /// Results per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Field to sort on
    #[serde(default = "default_sort_field")]
    pub sort_field: String,
    /// Sort direction
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            free_text: None,
            search_type: SearchType::MatchAll,
            filters: FilterSet::default(),
            page: default_page(),
            page_size: default_page_size(),
            sort_field: default_sort_field(),
            sort_order: SortOrder::Desc,
        }
    }
}

impl SearchRequest {
    /// Validates pagination and filters before compilation
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if page or page size is zero, the
    /// page size exceeds `max_page_size`, or a filter is invalid
    pub fn validate(&self, max_page_size: u32) -> Result<()> {
        if self.page == 0 {
            return Err(CatalogError::validation("page must be at least 1"));
        }
        if self.page_size == 0 {
            return Err(CatalogError::validation("pageSize must be at least 1"));
        }
        if self.page_size > max_page_size {
            return Err(CatalogError::validation(format!(
                "pageSize cannot exceed {}",
                max_page_size
            )));
        }
        if self.sort_field.trim().is_empty() {
            return Err(CatalogError::validation("sortField cannot be empty"));
        }
        self.filters.validate()
    }

    /// Offset of the first hit on the requested page
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_field() -> String {
    DEFAULT_SORT_FIELD.to_string()
}

/// Immutable query ready to be sent to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    root: Clause,
    aggregations: IndexMap<String, AggregationSpec>,
    sort: Option<SortSpec>,
    from: Option<u32>,
    size: Option<u32>,
}

impl CompiledQuery {
    /// Root clause of the query tree
    pub fn root(&self) -> &Clause {
        &self.root
    }

    /// Named aggregations
    pub fn aggregations(&self) -> &IndexMap<String, AggregationSpec> {
        &self.aggregations
    }

    /// Sort specification
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Offset of the first hit
    pub fn from(&self) -> Option<u32> {
        self.from
    }

    /// Number of hits requested
    pub fn size(&self) -> Option<u32> {
        self.size
    }

    /// True for queries that only compute aggregations
    pub fn is_aggregation_only(&self) -> bool {
        self.size == Some(0)
    }

    /// Renders the full request body for the engine's search endpoint
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.root.to_json());

        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if let Some(ref sort) = self.sort {
            body.insert("sort".to_string(), sort.to_json());
        }
        if !self.aggregations.is_empty() {
            let aggs: Map<String, Value> = self
                .aggregations
                .iter()
                .map(|(name, spec)| (name.clone(), spec.to_json()))
                .collect();
            body.insert("aggs".to_string(), Value::Object(aggs));
        }
        body.insert("track_total_hits".to_string(), json!(true));

        Value::Object(body)
    }
}

impl Serialize for CompiledQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_body().serialize(serializer)
    }
}

/// Step-by-step construction of a [`CompiledQuery`]
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    primary: Clause,
    filters: Vec<Clause>,
    aggregations: IndexMap<String, AggregationSpec>,
    sort: Option<SortSpec>,
    from: Option<u32>,
    size: Option<u32>,
}

impl QueryBuilder {
    /// Starts from a primary match clause
    pub fn new(primary: Clause) -> Self {
        Self {
            primary,
            filters: Vec::new(),
            aggregations: IndexMap::new(),
            sort: None,
            from: None,
            size: None,
        }
    }

    /// Starts an aggregation-only query (`size = 0`, match-all primary)
    ///
    /// A narrowing text clause, if any, is applied as a non-scoring filter
    /// ahead of `filters`.
    pub fn aggregation_only(narrowing: Option<Clause>, filters: Vec<Clause>) -> Self {
        let mut all_filters = Vec::with_capacity(filters.len() + 1);
        if let Some(clause) = narrowing.filter(|c| *c != Clause::MatchAll) {
            all_filters.push(clause);
        }
        all_filters.extend(filters);

        Self::new(Clause::MatchAll).filters(all_filters).size(0)
    }

    /// Appends non-scoring filter clauses
    pub fn filters(mut self, clauses: Vec<Clause>) -> Self {
        self.filters.extend(clauses);
        self
    }

    /// Adds a named aggregation
    pub fn aggregation(mut self, name: &str, spec: AggregationSpec) -> Self {
        self.aggregations.insert(name.to_string(), spec);
        self
    }

    /// Adds several named aggregations
    pub fn aggregations(mut self, specs: IndexMap<String, AggregationSpec>) -> Self {
        self.aggregations.extend(specs);
        self
    }

    /// Sets a single-field sort
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets offset and size from a 1-based page
    pub fn paginate(mut self, page: u32, page_size: u32) -> Self {
        self.from = Some(page.saturating_sub(1).saturating_mul(page_size));
        self.size = Some(page_size);
        self
    }

    /// Sets the number of hits without an offset
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Finalizes the query tree
    ///
    /// With no filters the primary clause is the root; otherwise it becomes
    /// the sole `must` entry of a boolean node.
    pub fn build(self) -> CompiledQuery {
        let root = if self.filters.is_empty() {
            self.primary
        } else {
            Clause::Bool(BoolClause {
                must: vec![self.primary],
                filter: self.filters,
                ..Default::default()
            })
        };

        CompiledQuery {
            root,
            aggregations: self.aggregations,
            sort: self.sort,
            from: self.from,
            size: self.size,
        }
    }
}

/// Compiles a search request into a paginated, sorted query
pub fn compile(request: &SearchRequest) -> CompiledQuery {
    let primary = request
        .search_type
        .primary_clause(request.free_text.as_deref());

    let compiled = QueryBuilder::new(primary)
        .filters(build_filter_clauses(&request.filters))
        .sort(SortSpec::new(&request.sort_field, request.sort_order))
        .paginate(request.page, request.page_size)
        .build();

    debug!(
        "Compiled {} search: root={}, from={:?}, size={:?}",
        request.search_type,
        compiled.root().kind(),
        compiled.from(),
        compiled.size()
    );

    compiled
}

/// Compiles an aggregation-only query over the population a request selects
pub fn compile_aggregations(
    request: &SearchRequest,
    aggregations: IndexMap<String, AggregationSpec>,
) -> CompiledQuery {
    let narrowing = request
        .search_type
        .primary_clause(request.free_text.as_deref());

    QueryBuilder::aggregation_only(Some(narrowing), build_filter_clauses(&request.filters))
        .aggregations(aggregations)
        .build()
}
