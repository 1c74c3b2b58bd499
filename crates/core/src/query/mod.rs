//! Search-request compilation
//!
//! Turns user-facing search parameters into the engine's boolean query tree.
//! [`filter`] produces non-scoring clauses from a [`FilterSet`], [`compiler`]
//! combines them with a primary match, sort and pagination.

pub mod clause;
pub mod compiler;
pub mod filter;

pub use clause::{BoolClause, BoostedField, Clause, Fuzziness, RangeBounds, TermValue};
pub use compiler::{
    compile, compile_aggregations, CompiledQuery, QueryBuilder, SearchRequest, SearchType,
    SortOrder, SortSpec, DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD,
};
pub use filter::{build_filter_clauses, FilterSet};
