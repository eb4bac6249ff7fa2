//! Export traits and errors

use super::ResultCollection;
use thiserror::Error;

/// Errors that can occur during export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Writes a record collection as a table
///
/// The column set is fixed: one header row with every `Field` column, then one
/// row per record in collection order.
pub trait TabularExporter: Send + Sync {
    /// Writes the whole collection and returns the number of data rows
    fn export(&self, collection: &ResultCollection) -> ExportResult<usize>;

    /// Where the table goes, for logging
    fn destination(&self) -> String;
}
