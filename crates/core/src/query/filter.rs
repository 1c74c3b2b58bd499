//! Filter clause builder
//!
//! Turns a typed [`FilterSet`] into non-scoring filter clauses. Only present
//! fields produce a clause; an absent field never becomes an always-true
//! placeholder.

use super::clause::{Clause, RangeBounds};
use crate::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Field used for exact category matches
pub const CATEGORY_FIELD: &str = "category.keyword";
/// Field used for price ranges
pub const PRICE_FIELD: &str = "price";
/// Field used for rating floors
pub const RATING_FIELD: &str = "rating";
/// Field used for stock status
pub const STOCK_FIELD: &str = "inStock";
/// Field used for tag membership
pub const TAGS_FIELD: &str = "tags.keyword";

/// Structured filters accepted by every search-style endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    /// Exact category
    #[serde(default)]
    pub category: Option<String>,
    /// Inclusive lower price bound
    #[serde(default)]
    pub price_min: Option<f64>,
    /// Inclusive upper price bound
    #[serde(default)]
    pub price_max: Option<f64>,
    /// Minimum rating
    #[serde(default)]
    pub rating_min: Option<f64>,
    /// Stock status
    #[serde(default)]
    pub in_stock: Option<bool>,
    /// Products carrying any of these tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl FilterSet {
    /// Number of fields that will produce a clause
    pub fn present_count(&self) -> usize {
        [
            self.category.is_some(),
            self.price_min.is_some() || self.price_max.is_some(),
            self.rating_min.is_some(),
            self.in_stock.is_some(),
            !self.tags.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// True when no field is present
    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    /// Validates filter values at the boundary
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for negative or inverted price
    /// bounds and for rating floors outside 0..=5
    pub fn validate(&self) -> Result<()> {
        for (label, bound) in [("priceMin", self.price_min), ("priceMax", self.price_max)] {
            if let Some(value) = bound {
                if !value.is_finite() || value < 0.0 {
                    return Err(CatalogError::validation(format!(
                        "{} must be a non-negative number",
                        label
                    )));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(CatalogError::validation(
                    "priceMin cannot be greater than priceMax",
                ));
            }
        }

        if let Some(rating) = self.rating_min {
            if !(0.0..=5.0).contains(&rating) {
                return Err(CatalogError::validation(
                    "ratingMin must be between 0 and 5",
                ));
            }
        }

        Ok(())
    }
}

/// Builds filter clauses in fixed order: category, price, rating, stock, tags
pub fn build_filter_clauses(filters: &FilterSet) -> Vec<Clause> {
    let mut clauses = Vec::with_capacity(filters.present_count());

    if let Some(ref category) = filters.category {
        clauses.push(Clause::term_text(CATEGORY_FIELD, category));
    }

    let price = RangeBounds::between(filters.price_min, filters.price_max);
    if !price.is_unbounded() {
        clauses.push(Clause::range(PRICE_FIELD, price));
    }

    if let Some(rating) = filters.rating_min {
        clauses.push(Clause::range(RATING_FIELD, RangeBounds::at_least(rating)));
    }

    if let Some(in_stock) = filters.in_stock {
        clauses.push(Clause::term_bool(STOCK_FIELD, in_stock));
    }

    if !filters.tags.is_empty() {
        clauses.push(Clause::Terms {
            field: TAGS_FIELD.to_string(),
            values: filters.tags.iter().cloned().collect(),
        });
    }

    clauses
}
