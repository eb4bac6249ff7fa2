//! Run statistics
//!
//! Counters kept by the coordinator while it crawls, logged and printed at
//! the end of a run.

use crate::extract::{DetailRecord, Field};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct RunStatistics {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished, if it did
    pub finished_at: Option<DateTime<Utc>>,

    /// Result pages whose list was walked
    pub pages_visited: u64,

    /// Detail links counted across all pages
    pub links_seen: u64,

    /// Records appended to the collection
    pub records: u64,

    /// List items that produced no record
    pub failed_items: u64,

    /// Per-field count of records that kept the sentinel
    pub misses: BTreeMap<Field, u64>,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_visited: 0,
            links_seen: 0,
            records: 0,
            failed_items: 0,
            misses: BTreeMap::new(),
        }
    }

    pub fn record_page(&mut self, links: usize) {
        self.pages_visited += 1;
        self.links_seen += links as u64;
    }

    pub fn record_detail(&mut self, record: &DetailRecord) {
        self.records += 1;
        for field in record.missing() {
            *self.misses.entry(*field).or_insert(0) += 1;
        }
    }

    pub fn record_failure(&mut self) {
        self.failed_items += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of seen links that produced a record, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.links_seen == 0 {
            return 0.0;
        }
        (self.records as f64 / self.links_seen as f64) * 100.0
    }

    /// Logs a one-line summary
    pub fn log_summary(&self) {
        tracing::info!(
            "Run summary: {} pages, {} links, {} records, {} failed items",
            self.pages_visited,
            self.links_seen,
            self.records,
            self.failed_items
        );
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(seconds) = stats.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!("  Result pages visited: {}", stats.pages_visited);
    println!("  Detail links seen: {}", stats.links_seen);
    println!("  Records collected: {}", stats.records);
    println!("  Failed items: {}", stats.failed_items);
    println!();

    if !stats.misses.is_empty() {
        println!("Fields not found:");
        let mut misses: Vec<_> = stats.misses.iter().collect();
        misses.sort_by(|a, b| b.1.cmp(a.1));

        for (field, count) in misses {
            println!("  {}: {}", field, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} links extracted)",
        stats.success_rate(),
        stats.records,
        stats.links_seen
    );
}
