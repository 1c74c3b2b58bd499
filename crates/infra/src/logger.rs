//! Logging setup for Catalog Search
//!
//! Installs a global `tracing` subscriber. Output is JSON by default so the
//! server's request logs can be shipped as-is; plain text is available for
//! local runs.

use catalog_core::config::LoggingConfig;
use catalog_core::{CatalogError, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Crates whose chatter is capped at `warn`
const QUIET_TARGETS: [&str; 4] = ["hyper", "reqwest", "h2", "tower_http"];

/// Logger configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to use JSON format
    pub json_format: bool,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include file/line information
    pub with_file_info: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            with_timestamps: true,
            with_file_info: false,
        }
    }
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            json_format: !config.format.eq_ignore_ascii_case("pretty")
                && !config.format.eq_ignore_ascii_case("plain"),
            ..Default::default()
        }
    }
}

impl LoggerConfig {
    /// Apply `CATALOG_LOG_*` variables on top of this configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("CATALOG_LOG_LEVEL") {
            self.level = level;
        }
        self.json_format = env_flag("CATALOG_LOG_JSON", self.json_format);
        self.with_timestamps = env_flag("CATALOG_LOG_TIMESTAMPS", self.with_timestamps);
        self.with_file_info = env_flag("CATALOG_LOG_FILE_INFO", self.with_file_info);
        self
    }
}

fn env_flag(name: &str, fallback: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

fn build_filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for target in QUIET_TARGETS {
        let directive = format!("{}=warn", target).parse().map_err(|e| {
            CatalogError::validation(format!("Invalid log directive for {}: {}", target, e))
        })?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

/// Initialize the global logger with the given configuration
pub fn init_logger(config: LoggerConfig) -> Result<()> {
    let level = LogLevel::parse(&config.level)?;
    let env_filter = build_filter(level)?;

    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .boxed()
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info);

        if config.with_timestamps {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| CatalogError::invalid_state(format!("Failed to initialize logger: {}", e)))?;

    tracing::info!("Logger initialized with level: {}", config.level);
    Ok(())
}

/// Initialize logger for testing (reduces noise)
pub fn init_test_logger() -> Result<()> {
    let config = LoggerConfig {
        level: "warn".to_string(),
        json_format: false,
        with_timestamps: false,
        with_file_info: false,
    };

    // Ignore errors if already initialized
    let _ = init_logger(config);
    Ok(())
}

/// Create a logger configuration from environment variables alone
pub fn logger_config_from_env() -> LoggerConfig {
    LoggerConfig::default().with_env_overrides()
}

/// Log level utilities
pub struct LogLevel;

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level: &str) -> Result<Level> {
        Level::from_str(level).map_err(|e| {
            CatalogError::validation(format!("Invalid log level '{}': {}", level, e))
        })
    }

    /// Get all available log levels
    pub fn all_levels() -> Vec<&'static str> {
        vec!["trace", "debug", "info", "warn", "error"]
    }

    /// Check if a log level string is valid
    pub fn is_valid(level: &str) -> bool {
        Self::all_levels().contains(&level.to_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_config_default() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.json_format);
        assert!(config.with_timestamps);
        assert!(!config.with_file_info);
    }

    #[test]
    fn test_from_logging_config() {
        let pretty = LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };
        let config = LoggerConfig::from(&pretty);
        assert_eq!(config.level, "debug");
        assert!(!config.json_format);

        let json = LoggerConfig::from(&LoggingConfig::default());
        assert!(json.json_format);
    }

    #[test]
    fn test_log_level_parse() {
        assert!(LogLevel::parse("info").is_ok());
        assert!(LogLevel::parse("debug").is_ok());
        assert!(matches!(
            LogLevel::parse("loud"),
            Err(CatalogError::Validation { .. })
        ));
    }

    #[test]
    fn test_log_level_validation() {
        assert!(LogLevel::is_valid("info"));
        assert!(LogLevel::is_valid("ERROR"));
        assert!(!LogLevel::is_valid("invalid"));
        assert_eq!(LogLevel::all_levels().len(), 5);
    }

    #[test]
    fn test_build_filter() {
        assert!(build_filter(Level::DEBUG).is_ok());
    }

    #[test]
    fn test_logger_config_from_env() {
        std::env::set_var("CATALOG_LOG_LEVEL", "debug");
        std::env::set_var("CATALOG_LOG_JSON", "false");
        std::env::set_var("CATALOG_LOG_FILE_INFO", "not-a-bool");

        let config = logger_config_from_env();
        assert_eq!(config.level, "debug");
        assert!(!config.json_format);
        assert!(!config.with_file_info);

        std::env::remove_var("CATALOG_LOG_LEVEL");
        std::env::remove_var("CATALOG_LOG_JSON");
        std::env::remove_var("CATALOG_LOG_FILE_INFO");
    }

    #[test]
    fn test_invalid_level_rejected_before_install() {
        let config = LoggerConfig {
            level: "chatty".to_string(),
            ..Default::default()
        };
        assert!(init_logger(config).is_err());
    }

    #[tokio::test]
    async fn test_init_test_logger() {
        assert!(init_test_logger().is_ok());
        assert!(init_test_logger().is_ok());
    }
}
