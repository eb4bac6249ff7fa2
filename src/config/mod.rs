//! Configuration module for the listing crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Searching for: {}", config.search.property_type);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AbortPolicy, BrowserConfig, Config, OutputConfig, PriceBandConfig, SearchConfig, SiteConfig,
    TimeoutConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_config_text, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
