//! Error handling for Catalog Search core library

use std::fmt;
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Main error type for catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Caller supplied invalid input
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// The search engine rejected or failed a request
    #[error("Search engine error: {message}")]
    Engine { message: String },

    /// Network connectivity errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Invalid state errors
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl CatalogError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a search engine error
    pub fn engine<S: Into<String>>(message: S) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Http(_)
        )
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) => ErrorCategory::FileSystem,
            Self::Http(_) | Self::Network { .. } => ErrorCategory::Network,
            Self::Json(_) | Self::Yaml(_) => ErrorCategory::Serialization,
            Self::Config(_) | Self::Url(_) => ErrorCategory::Configuration,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Engine { .. } => ErrorCategory::Engine,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::InvalidState { .. } => ErrorCategory::State,
            Self::Generic(_) => ErrorCategory::Generic,
        }
    }
}

/// Error categories for metrics and logging
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    FileSystem,
    Network,
    Serialization,
    Configuration,
    Validation,
    NotFound,
    Engine,
    Timeout,
    State,
    Generic,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileSystem => write!(f, "filesystem"),
            Self::Network => write!(f, "network"),
            Self::Serialization => write!(f, "serialization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Engine => write!(f, "engine"),
            Self::Timeout => write!(f, "timeout"),
            Self::State => write!(f, "state"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CatalogError::engine("index_not_found_exception");
        assert!(matches!(err, CatalogError::Engine { .. }));
        assert_eq!(
            err.to_string(),
            "Search engine error: index_not_found_exception"
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            CatalogError::validation("bad").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            CatalogError::network("down").category(),
            ErrorCategory::Network
        );
        assert_eq!(
            CatalogError::not_found("product 1").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(CatalogError::network("test").is_retryable());
        assert!(CatalogError::timeout("search").is_retryable());
        assert!(!CatalogError::validation("test").is_retryable());
        assert!(!CatalogError::engine("parse failure").is_retryable());
    }

    #[test]
    fn test_error_from_conversions() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CatalogError = io_err.into();
        assert!(matches!(err, CatalogError::Io(_)));

        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: CatalogError = json_err.into();
        assert!(matches!(err, CatalogError::Json(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CatalogError::not_found("product abc");
        assert_eq!(err.to_string(), "Resource not found: product abc");

        let err = CatalogError::timeout("benchmark");
        assert_eq!(err.to_string(), "Operation timed out: benchmark");
    }
}
