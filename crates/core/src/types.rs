//! Core type definitions for Catalog Search

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product identifier as stored in the search index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    /// Generate a new random product ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single benchmark invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new random run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog product as indexed in the search engine
///
/// Field names are serialized in camelCase to match the index mapping
/// (`inStock`, `createdAt`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Document identifier; filled from the engine's `_id` when the source omits it
    #[serde(default)]
    pub id: String,
    /// Product display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Catalog category
    pub category: String,
    /// Unit price
    pub price: f64,
    /// Average customer rating, 0 to 5
    #[serde(default)]
    pub rating: f64,
    /// Whether the product is currently in stock
    #[serde(default)]
    pub in_stock: bool,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Validate the fields a caller must supply before indexing
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::CatalogError::validation("Product name is required"));
        }
        if self.category.trim().is_empty() {
            return Err(crate::CatalogError::validation(
                "Product category is required",
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(crate::CatalogError::validation(
                "Product price must be a non-negative number",
            ));
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(crate::CatalogError::validation(
                "Product rating must be between 0 and 5",
            ));
        }
        Ok(())
    }

    /// Assign a generated identifier when none was supplied
    pub fn ensure_id(&mut self) -> ProductId {
        if self.id.trim().is_empty() {
            self.id = ProductId::generate().0;
        }
        ProductId(self.id.clone())
    }
}
