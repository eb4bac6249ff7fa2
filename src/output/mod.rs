//! Output module for collecting and exporting extracted records
//!
//! This module handles:
//! - Accumulating records in visitation order (`ResultCollection`, `ResultSink`)
//! - Exporting the collection as a delimited table (`CsvExporter`)
//! - Recording run statistics (`RunStatistics`)

mod collection;
mod csv;
pub mod stats;
mod traits;

pub use collection::{ResultCollection, ResultSink};
pub use csv::CsvExporter;
pub use stats::{print_statistics, RunStatistics};
pub use traits::{ExportError, ExportResult, TabularExporter};
