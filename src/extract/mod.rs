//! Detail view extraction
//!
//! Extraction is split in two halves. A [`DetailSnapshot`] is the raw corpus of
//! a detail view (title, label/value pairs, description block, bold labels),
//! read in-page by the driver or parsed from literal HTML. [`extract_record`]
//! is a pure function from that corpus to a [`DetailRecord`], so the label
//! heuristics run without a browser.

mod fields;
mod snapshot;

pub use fields::{extract_record, DetailRecord, Field, RecordBuilder};
pub use snapshot::{BoldLabel, DetailSnapshot, LabelValue};
