//! Field schema and label heuristics

use super::snapshot::DetailSnapshot;
use crate::text::{normalize_label, squash_whitespace, strip_label_prefix};
use serde::Serialize;
use std::fmt;

/// Minimum length of an address recovered from a bold label's parent
const MIN_ADDRESS_LEN: usize = 6;

/// A column of the exported table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Field {
    Name,
    PropertyType,
    TotalArea,
    PrivateArea,
    Bedrooms,
    Parking,
    Address,
    Description,
    DetailLink,
}

impl Field {
    /// Every field, in column order
    pub const ALL: [Field; 9] = [
        Self::Name,
        Self::PropertyType,
        Self::TotalArea,
        Self::PrivateArea,
        Self::Bedrooms,
        Self::Parking,
        Self::Address,
        Self::Description,
        Self::DetailLink,
    ];

    /// Column header
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::PropertyType => "Type",
            Self::TotalArea => "Total Area",
            Self::PrivateArea => "Private Area",
            Self::Bedrooms => "Bedrooms",
            Self::Parking => "Parking",
            Self::Address => "Address",
            Self::Description => "Description",
            Self::DetailLink => "Detail Link",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Synonym groups tested against a normalized label, first match wins
///
/// A rule matches when every keyword of one of its alternatives is contained in
/// the label. The trailing `IMOVEL` rule catches labels such as "Imóvel:" that
/// carry the listing name.
const LABEL_RULES: &[(Field, &[&[&str]])] = &[
    (Field::PropertyType, &[&["TIPO", "IMOVEL"]]),
    (Field::TotalArea, &[&["AREA TOTAL"]]),
    (Field::PrivateArea, &[&["AREA PRIVATIVA"], &["AREA UTIL"]]),
    (Field::Bedrooms, &[&["QUARTO"], &["DORMITORIO"]]),
    (Field::Parking, &[&["GARAGEM"], &["VAGA"]]),
    (Field::Address, &[&["ENDERECO"], &["LOGRADOURO"]]),
    (Field::Description, &[&["DESCRICAO"]]),
    (Field::Name, &[&["IMOVEL"]]),
];

/// Field a label maps to, if any
pub(crate) fn classify_label(label: &str) -> Option<Field> {
    let label = normalize_label(label);
    LABEL_RULES
        .iter()
        .find(|(_, alternatives)| {
            alternatives
                .iter()
                .any(|keywords| keywords.iter().all(|k| label.contains(k)))
        })
        .map(|(field, _)| *field)
}

/// One extracted listing, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    values: [String; 9],
    missing: Vec<Field>,
}

impl DetailRecord {
    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Fields that kept the sentinel value
    pub fn missing(&self) -> &[Field] {
        &self.missing
    }

    /// Returns true if no heuristic filled the field
    pub fn is_missing(&self, field: Field) -> bool {
        self.missing.contains(&field)
    }
}

/// Collects field values; the first value set for a field wins
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    values: [Option<String>; 9],
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field unless it already holds a value
    ///
    /// Values are trimmed; empty values are ignored. Returns true if the value
    /// was taken.
    pub fn offer(&mut self, field: Field, value: &str) -> bool {
        let value = value.trim();
        let slot = &mut self.values[field.index()];
        if slot.is_some() || value.is_empty() {
            return false;
        }
        *slot = Some(value.to_string());
        true
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.values[field.index()].is_some()
    }

    /// Fills unset fields with the sentinel
    pub fn build(self, sentinel: &str) -> DetailRecord {
        let mut missing = Vec::new();
        let values = Field::ALL.map(|field| match &self.values[field.index()] {
            Some(value) => value.clone(),
            None => {
                missing.push(field);
                sentinel.to_string()
            }
        });
        DetailRecord { values, missing }
    }
}

/// Applies the extraction heuristics to a detail snapshot
///
/// Layers, each only filling fields still unset:
/// 1. the page title becomes the name
/// 2. label/value pairs are classified by [`LABEL_RULES`]
/// 3. the description container fills the description
/// 4. a bold "Endereço" label's parent text fills the address
///
/// # Example
///
/// ```
/// use listing_crawler::extract::{extract_record, DetailSnapshot, Field};
///
/// let snapshot = DetailSnapshot::from_html(
///     "<table><tr><th>Tipo de Imóvel</th><td>Apartamento</td></tr></table>",
/// );
/// let record = extract_record(&snapshot, "https://example.com/d/1", "not found");
/// assert_eq!(record.get(Field::PropertyType), "Apartamento");
/// assert_eq!(record.get(Field::Description), "not found");
/// ```
pub fn extract_record(snapshot: &DetailSnapshot, detail_link: &str, sentinel: &str) -> DetailRecord {
    let mut builder = RecordBuilder::new();
    builder.offer(Field::DetailLink, detail_link);

    if let Some(title) = &snapshot.title {
        builder.offer(Field::Name, title);
    }

    for pair in &snapshot.pairs {
        if let Some(field) = classify_label(&pair.label) {
            builder.offer(field, &squash_whitespace(&pair.value));
        }
    }

    if let Some(description) = &snapshot.description {
        builder.offer(Field::Description, description);
    }

    if !builder.is_set(Field::Address) {
        let address = snapshot
            .bold_labels
            .iter()
            .filter(|b| normalize_label(&b.label).contains("ENDERECO"))
            .map(|b| strip_label_prefix(&b.context, "ENDERECO"))
            .find(|s| s.chars().count() >= MIN_ADDRESS_LEN);
        if let Some(address) = address {
            builder.offer(Field::Address, &address);
        }
    }

    let record = builder.build(sentinel);
    if !record.missing().is_empty() {
        tracing::debug!(
            "Fields not found: {}",
            record
                .missing()
                .iter()
                .map(Field::column)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    record
}
