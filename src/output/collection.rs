use super::{ExportResult, TabularExporter};
use crate::extract::DetailRecord;

/// Append-only sequence of records in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCollection {
    records: Vec<DetailRecord>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: DetailRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetailRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[DetailRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a DetailRecord;
    type IntoIter = std::slice::Iter<'a, DetailRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Owns the collection and hands it to the exporter once, at the end of a run
pub struct ResultSink {
    collection: ResultCollection,
    exporter: Box<dyn TabularExporter>,
}

impl ResultSink {
    pub fn new(exporter: Box<dyn TabularExporter>) -> Self {
        Self {
            collection: ResultCollection::new(),
            exporter,
        }
    }

    /// Appends a record; it is never modified afterwards
    pub fn append(&mut self, record: DetailRecord) {
        self.collection.push(record);
        tracing::debug!("Collected record #{}", self.collection.len());
    }

    pub fn collection(&self) -> &ResultCollection {
        &self.collection
    }

    /// Exports the full collection
    ///
    /// Returns `None` without touching the destination when nothing was
    /// collected.
    pub fn export(&self) -> ExportResult<Option<usize>> {
        if self.collection.is_empty() {
            tracing::warn!(
                "No records collected, nothing written to {}. Check the list and detail selectors",
                self.exporter.destination()
            );
            return Ok(None);
        }

        let rows = self.exporter.export(&self.collection)?;
        tracing::info!("Exported {} records to {}", rows, self.exporter.destination());
        Ok(Some(rows))
    }

    pub fn into_collection(self) -> ResultCollection {
        self.collection
    }
}
