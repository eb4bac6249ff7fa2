//! Crawler module for driving the search and collecting records
//!
//! This module contains the core crawling logic, including:
//! - Frame resolution by capability
//! - The two-stage search form
//! - Result list pagination
//! - Detail view navigation and extraction
//! - Overall crawl coordination

mod coordinator;
pub mod detail;
pub mod form;
pub mod frames;
pub mod pagination;

pub use coordinator::{Coordinator, CrawlReport};
pub use form::FormSequencer;

use crate::config::{Config, TimeoutConfig};
use crate::driver::{BrowserDriver, DriverError};
use crate::{CrawlerError, Result};
use std::sync::Arc;

/// Runs a complete crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the search form and drive both stages
/// 2. Discover the result pages
/// 3. Visit and extract every detail link, page by page
/// 4. Export the collected records
///
/// The report carries the records even when the run ended early.
pub async fn crawl(driver: Arc<dyn BrowserDriver>, config: Config) -> CrawlReport {
    let mut coordinator = Coordinator::new(driver, config);
    let error = coordinator.run().await.err();
    coordinator.into_report(error)
}

/// Pauses after a click that navigates, then waits for the document to parse
pub(crate) async fn settle_after_click(driver: &dyn BrowserDriver, timeouts: &TimeoutConfig) -> Result<()> {
    tokio::time::sleep(timeouts.settle_pause()).await;
    match driver.wait_for_load(timeouts.navigation_timeout()).await {
        Ok(()) => Ok(()),
        Err(DriverError::Timeout(waited)) => Err(CrawlerError::timeout("the page to load", waited)),
        Err(e) => Err(e.into()),
    }
}
