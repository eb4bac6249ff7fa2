//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that ties the components
//! together:
//! - Opening the search form and driving it to the result list
//! - Walking every result page and every detail link on it
//! - Stopping when the browser window is closed
//! - Exporting what was collected, on success and (by policy) on abort

use super::detail::{count_detail_links, extract_detail, go_back, open_detail, wait_detail_ready};
use super::form::FormSequencer;
use super::pagination::{collect_page_indices, goto_page, wait_list_ready};
use crate::config::{AbortPolicy, Config};
use crate::driver::{BrowserDriver, DriverError, FrameId};
use crate::extract::{Field, RecordBuilder};
use crate::output::{CsvExporter, ResultCollection, ResultSink, RunStatistics, TabularExporter};
use crate::state::SearchSession;
use crate::{CrawlerError, Result};
use std::sync::Arc;

/// Main crawler coordinator structure
pub struct Coordinator {
    driver: Arc<dyn BrowserDriver>,
    config: Arc<Config>,
    session: SearchSession,
    sink: ResultSink,
    stats: RunStatistics,
    exported_rows: Option<usize>,
}

/// Everything a finished or aborted run leaves behind
pub struct CrawlReport {
    /// Records in visitation order
    pub records: ResultCollection,

    /// Filters applied and pages discovered
    pub session: SearchSession,

    pub stats: RunStatistics,

    /// Rows written by the exporter, if it ran
    pub exported_rows: Option<usize>,

    /// The error that ended the run early
    pub error: Option<CrawlerError>,
}

impl CrawlReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl Coordinator {
    /// Creates a coordinator exporting to the configured CSV file
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Config) -> Self {
        let exporter = CsvExporter::from_config(&config.output);
        let session = SearchSession::new(&config.site.target_url);

        Self {
            driver,
            config: Arc::new(config),
            session,
            sink: ResultSink::new(Box::new(exporter)),
            stats: RunStatistics::new(),
            exported_rows: None,
        }
    }

    /// Replaces the exporter
    pub fn with_exporter(mut self, exporter: Box<dyn TabularExporter>) -> Self {
        self.sink = ResultSink::new(exporter);
        self
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Records collected so far
    pub fn records(&self) -> &ResultCollection {
        self.sink.collection()
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn exported_rows(&self) -> Option<usize> {
        self.exported_rows
    }

    /// Runs the crawl to completion, abort or window closure
    ///
    /// On success the collection is exported. On any error the collection is
    /// exported or dropped per `output.on-abort` before the error is returned;
    /// the records stay available through [`Coordinator::records`] either way.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting crawl of {}", self.session.target_url());

        let driver = Arc::clone(&self.driver);
        let outcome = tokio::select! {
            biased;
            _ = driver.closed() => {
                tracing::warn!("Browser window was closed, stopping the crawl");
                Err(CrawlerError::BrowserClosed)
            }
            result = self.drive() => result.map_err(|e| match e {
                CrawlerError::Driver(DriverError::Closed) => CrawlerError::BrowserClosed,
                other => other,
            }),
        };

        self.stats.finish();
        self.stats.log_summary();

        match outcome {
            Ok(()) => {
                self.exported_rows = self.sink.export()?;
                tracing::info!("Crawl complete");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Crawl aborted: {}", e);
                self.handle_abort();
                Err(e)
            }
        }
    }

    /// Consumes the coordinator into a report
    pub fn into_report(self, error: Option<CrawlerError>) -> CrawlReport {
        CrawlReport {
            records: self.sink.into_collection(),
            session: self.session,
            stats: self.stats,
            exported_rows: self.exported_rows,
            error,
        }
    }

    fn handle_abort(&mut self) {
        let collected = self.sink.collection().len();
        match self.config.output.on_abort {
            AbortPolicy::Export => match self.sink.export() {
                Ok(rows) => self.exported_rows = rows,
                Err(e) => tracing::error!("Failed to export partial results: {}", e),
            },
            AbortPolicy::Discard => {
                if collected > 0 {
                    tracing::warn!("Discarding {} records collected before the abort", collected);
                }
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        let driver = Arc::clone(&self.driver);
        let driver = driver.as_ref();
        let config = Arc::clone(&self.config);
        let timeouts = &config.timeouts;

        driver
            .goto(&config.site.target_url, timeouts.navigation_timeout())
            .await
            .map_err(|e| match e {
                DriverError::Timeout(waited) => CrawlerError::timeout("the search form", waited),
                other => other.into(),
            })?;

        FormSequencer::new(driver, &config)
            .run(&mut self.session)
            .await?;

        let mut list_frame = wait_list_ready(driver, timeouts).await?;
        let pages = collect_page_indices(driver).await?;
        self.session.set_page_indices(pages);
        let pages = self.session.page_indices().to_vec();

        for (position, page) in pages.into_iter().enumerate() {
            if position > 0 {
                goto_page(driver, &list_frame, page, timeouts).await?;
            }
            self.session.set_current_page(page);
            list_frame = self.crawl_page(driver, &config, page).await?;
        }

        Ok(())
    }

    /// Visits every detail link of the current page
    ///
    /// The list frame is resolved again before each item. Returns the list
    /// frame as last resolved.
    async fn crawl_page(&mut self, driver: &dyn BrowserDriver, config: &Config, page: u32) -> Result<FrameId> {
        let mut index = 0;
        let mut first_count = None;

        loop {
            let (list_frame, count) = self.current_list(driver, config).await?;
            first_count.get_or_insert(count);

            if index >= count {
                self.stats.record_page(first_count.unwrap_or(count));
                tracing::info!("Page {} done: {} links", page, count);
                return Ok(list_frame);
            }

            tracing::info!("Page {}: item {}/{}", page, index + 1, count);
            self.visit_detail(driver, config, &list_frame, index).await?;
            index += 1;
        }
    }

    /// Resolves the list frame and counts its detail links
    ///
    /// A frame that detaches between the two calls is resolved once more.
    async fn current_list(&self, driver: &dyn BrowserDriver, config: &Config) -> Result<(FrameId, usize)> {
        let frame = wait_list_ready(driver, &config.timeouts).await?;
        match count_detail_links(driver, &frame).await {
            Ok(count) => Ok((frame, count)),
            Err(e) => {
                tracing::debug!("List frame {} went stale: {}", frame, e);
                let frame = wait_list_ready(driver, &config.timeouts).await?;
                let count = count_detail_links(driver, &frame).await?;
                Ok((frame, count))
            }
        }
    }

    /// Opens one detail view, extracts it and returns to the list
    async fn visit_detail(
        &mut self,
        driver: &dyn BrowserDriver,
        config: &Config,
        list_frame: &FrameId,
        index: usize,
    ) -> Result<()> {
        let timeouts = &config.timeouts;
        let sentinel = &config.output.sentinel;

        if let Err(e) = open_detail(driver, list_frame, index, timeouts).await {
            return match e {
                CrawlerError::Driver(DriverError::Closed) => Err(CrawlerError::BrowserClosed),
                CrawlerError::NavigationFailure { .. } | CrawlerError::Driver(_) => {
                    tracing::warn!("Skipping item {}: {}", index + 1, e);
                    self.stats.record_failure();
                    Ok(())
                }
                other => Err(other),
            };
        }

        let detail_frame = wait_detail_ready(driver, &config.site, timeouts).await?;

        let record = match extract_detail(driver, &detail_frame, sentinel).await {
            Ok(record) => record,
            Err(e) if !e.is_fatal() => {
                tracing::warn!("Extraction failed for item {}: {}", index + 1, e);
                let link = driver.current_url().await.unwrap_or_default();
                let mut builder = RecordBuilder::new();
                builder.offer(Field::DetailLink, &link);
                builder.build(sentinel)
            }
            Err(e) => return Err(e),
        };

        self.stats.record_detail(&record);
        self.sink.append(record);

        go_back(driver, &detail_frame, &config.site, timeouts).await
    }
}
