//! Query clause tree
//!
//! [`Clause`] is a closed sum type covering every clause shape the catalog
//! emits. Each variant serializes to the engine's JSON query DSL through
//! [`Clause::to_json`], so malformed trees cannot be built in the first place.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// A field name with an optional relevance boost (`name^3`)
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedField {
    pub name: String,
    pub boost: Option<f32>,
}

impl BoostedField {
    /// Field without boost
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            boost: None,
        }
    }

    /// Field with a relevance boost
    pub fn boosted(name: &str, boost: f32) -> Self {
        Self {
            name: name.to_string(),
            boost: Some(boost),
        }
    }
}

impl std::fmt::Display for BoostedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.boost {
            Some(boost) => write!(f, "{}^{}", self.name, boost),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Edit-distance tolerance for fuzzy matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Engine picks the distance from the term length
    Auto,
    /// Fixed maximum number of edits
    Edits(u8),
}

impl Fuzziness {
    fn to_json(self) -> Value {
        match self {
            Self::Auto => json!("AUTO"),
            Self::Edits(n) => json!(n),
        }
    }
}

/// Exact value compared by a term clause
#[derive(Debug, Clone, PartialEq)]
pub enum TermValue {
    Text(String),
    Bool(bool),
    Number(f64),
}

impl TermValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => json!(s),
            Self::Bool(b) => json!(b),
            Self::Number(n) => json!(n),
        }
    }
}

/// Numeric range bounds; absent bounds are omitted from the clause
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gte: Option<f64>,
    pub lte: Option<f64>,
    pub gt: Option<f64>,
    pub lt: Option<f64>,
}

impl RangeBounds {
    /// Inclusive bounds on either side
    pub fn between(gte: Option<f64>, lte: Option<f64>) -> Self {
        Self {
            gte,
            lte,
            ..Default::default()
        }
    }

    /// Inclusive lower bound only
    pub fn at_least(gte: f64) -> Self {
        Self {
            gte: Some(gte),
            ..Default::default()
        }
    }

    /// True when no bound is set
    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none() && self.gt.is_none() && self.lt.is_none()
    }

    fn to_json(&self) -> Value {
        let mut bounds = Map::new();
        for (key, value) in [
            ("gte", self.gte),
            ("lte", self.lte),
            ("gt", self.gt),
            ("lt", self.lt),
        ] {
            if let Some(v) = value {
                bounds.insert(key.to_string(), json!(v));
            }
        }
        Value::Object(bounds)
    }
}

/// Boolean composition node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolClause {
    /// Scoring clauses that must match
    pub must: Vec<Clause>,
    /// Non-scoring clauses that must all pass
    pub filter: Vec<Clause>,
    /// Optional scoring clauses
    pub should: Vec<Clause>,
    /// Clauses that must not match
    pub must_not: Vec<Clause>,
}

impl BoolClause {
    fn to_json(&self) -> Value {
        let mut node = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("filter", &self.filter),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                node.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(Clause::to_json).collect()),
                );
            }
        }
        json!({ "bool": node })
    }
}

/// A node of the compiled query tree
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Matches every document
    MatchAll,
    /// Full-text match across several weighted fields
    MultiMatch {
        query: String,
        fields: Vec<BoostedField>,
        fuzziness: Option<Fuzziness>,
    },
    /// Phrase match with bounded slop
    MatchPhrase {
        field: String,
        query: String,
        slop: u32,
    },
    /// Wildcard pattern on a keyword field
    Wildcard {
        field: String,
        value: String,
        case_insensitive: bool,
    },
    /// Edit-distance match on a single field
    Fuzzy {
        field: String,
        value: String,
        fuzziness: Fuzziness,
    },
    /// Exact value equality
    Term { field: String, value: TermValue },
    /// Membership in a set of exact values
    Terms { field: String, values: Vec<String> },
    /// Numeric range
    Range { field: String, bounds: RangeBounds },
    /// Boolean composition
    Bool(BoolClause),
}

impl Clause {
    /// Exact text equality on a keyword field
    pub fn term_text(field: &str, value: &str) -> Self {
        Self::Term {
            field: field.to_string(),
            value: TermValue::Text(value.to_string()),
        }
    }

    /// Exact boolean equality
    pub fn term_bool(field: &str, value: bool) -> Self {
        Self::Term {
            field: field.to_string(),
            value: TermValue::Bool(value),
        }
    }

    /// Numeric range clause
    pub fn range(field: &str, bounds: RangeBounds) -> Self {
        Self::Range {
            field: field.to_string(),
            bounds,
        }
    }

    /// Short name of the clause kind, used in logs and tests
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MatchAll => "match_all",
            Self::MultiMatch { .. } => "multi_match",
            Self::MatchPhrase { .. } => "match_phrase",
            Self::Wildcard { .. } => "wildcard",
            Self::Fuzzy { .. } => "fuzzy",
            Self::Term { .. } => "term",
            Self::Terms { .. } => "terms",
            Self::Range { .. } => "range",
            Self::Bool(_) => "bool",
        }
    }

    /// Render the clause as engine query DSL
    pub fn to_json(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::MultiMatch {
                query,
                fields,
                fuzziness,
            } => {
                let mut body = Map::new();
                body.insert("query".to_string(), json!(query));
                body.insert(
                    "fields".to_string(),
                    Value::Array(fields.iter().map(|f| json!(f.to_string())).collect()),
                );
                body.insert("type".to_string(), json!("best_fields"));
                if let Some(fuzziness) = fuzziness {
                    body.insert("fuzziness".to_string(), fuzziness.to_json());
                }
                json!({ "multi_match": body })
            }
            Self::MatchPhrase { field, query, slop } => json!({
                "match_phrase": { field: { "query": query, "slop": slop } }
            }),
            Self::Wildcard {
                field,
                value,
                case_insensitive,
            } => json!({
                "wildcard": { field: { "value": value, "case_insensitive": case_insensitive } }
            }),
            Self::Fuzzy {
                field,
                value,
                fuzziness,
            } => json!({
                "fuzzy": { field: { "value": value, "fuzziness": fuzziness.to_json() } }
            }),
            Self::Term { field, value } => json!({ "term": { field: value.to_json() } }),
            Self::Terms { field, values } => json!({ "terms": { field: values } }),
            Self::Range { field, bounds } => json!({ "range": { field: bounds.to_json() } }),
            Self::Bool(node) => node.to_json(),
        }
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
