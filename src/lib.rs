//! Listing-crawler: a browser-driven listing and detail crawler
//!
//! This crate drives a Chromium browser through a two-stage, frame-nested search
//! form, walks the paginated result list, opens every result's detail view,
//! extracts a fixed set of fields with layout-tolerant heuristics and exports
//! the collected records as a delimited table.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod extract;
pub mod output;
pub mod retry;
pub mod state;
pub mod text;

use std::time::Duration;
use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A frame, selector or option did not show up within its bound
    #[error("Timed out after {waited:?} waiting for {what}")]
    DiscoveryTimeout { what: String, waited: Duration },

    /// A control reads back a value other than the one that was set
    #[error("Field '{field}' should read '{expected}' but reads '{actual}'")]
    ValidationMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// A click or back action had no effect on any of its paths
    #[error("Navigation failed: {action}")]
    NavigationFailure { action: String },

    #[error("Browser window was closed")]
    BrowserClosed,

    #[error("Browser driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Export error: {0}")]
    Export(#[from] output::ExportError),

    #[error("Unexpected page data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlerError {
    /// Returns true if the error leaves the crawl in an untrustworthy state
    ///
    /// Navigation failures are only raised once every fallback path was tried.
    /// Driver and data errors are scoped to the operation that hit them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::DiscoveryTimeout { .. }
                | Self::ValidationMismatch { .. }
                | Self::NavigationFailure { .. }
                | Self::BrowserClosed
        )
    }

    pub(crate) fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        Self::DiscoveryTimeout {
            what: what.into(),
            waited,
        }
    }

    pub(crate) fn navigation(action: impl Into<String>) -> Self {
        Self::NavigationFailure {
            action: action.into(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlReport};
pub use extract::{DetailRecord, Field};
pub use state::{FormStage, SearchSession};
