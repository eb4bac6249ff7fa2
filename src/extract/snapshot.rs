//! Raw corpus of a detail view

use crate::text::squash_whitespace;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// A label and its value, as found in a table row or definition list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
    pub value: String,
}

/// A bold or strong element together with the text of its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoldLabel {
    pub label: String,
    pub context: String,
}

/// Everything the field heuristics look at on a detail view
///
/// The in-page `detail-snapshot` read returns exactly this shape as JSON.
/// [`DetailSnapshot::from_html`] builds the same value from markup, applying
/// the same rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSnapshot {
    /// Location of the document the view was read from; the detail view may
    /// live in a child frame whose URL differs from the page's
    pub link: Option<String>,

    /// First non-empty of `h1`, `h2`, `.titulo, .title, .tit`
    pub title: Option<String>,

    /// Table rows and definition list pairs in document order
    pub pairs: Vec<LabelValue>,

    /// First non-empty description container
    pub description: Option<String>,

    /// Every `b` and `strong` element
    pub bold_labels: Vec<BoldLabel>,
}

impl DetailSnapshot {
    /// Decodes the value returned by the in-page read
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Builds a snapshot from an HTML document
    ///
    /// # Example
    ///
    /// ```
    /// use listing_crawler::extract::DetailSnapshot;
    ///
    /// let html = "<table><tr><th>Tipo de Imóvel</th><td>Apartamento</td></tr></table>";
    /// let snapshot = DetailSnapshot::from_html(html);
    /// assert_eq!(snapshot.pairs[0].label, "Tipo de Imóvel");
    /// assert_eq!(snapshot.pairs[0].value, "Apartamento");
    /// ```
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);

        let title = ["h1", "h2", ".titulo, .title, .tit"]
            .iter()
            .find_map(|sel| first_text(&document, sel));

        let description = [
            "#descricao",
            ".descricao",
            "[id*='descri']",
            "[class*='descri']",
        ]
        .iter()
        .find_map(|sel| first_text(&document, sel));

        Self {
            link: None,
            title,
            pairs: extract_pairs(&document),
            description,
            bold_labels: extract_bold_labels(&document),
        }
    }
}

/// Trimmed text of the first element matching the selector, if non-empty
fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Text content with whitespace runs squashed
fn squashed_text(element: ElementRef<'_>) -> String {
    squash_whitespace(&element.text().collect::<String>())
}

fn extract_pairs(document: &Html) -> Vec<LabelValue> {
    let mut pairs = Vec::new();

    let (Ok(tr), Ok(th), Ok(td), Ok(dt)) = (
        Selector::parse("table tr"),
        Selector::parse("th"),
        Selector::parse("td"),
        Selector::parse("dt"),
    ) else {
        return pairs;
    };

    for row in document.select(&tr) {
        let headers: Vec<_> = row.select(&th).collect();
        let cells: Vec<_> = row.select(&td).collect();

        if headers.len() == 1 && cells.len() == 1 {
            pairs.push(LabelValue {
                label: squashed_text(headers[0]),
                value: squashed_text(cells[0]),
            });
        } else if headers.is_empty() && cells.len() >= 2 {
            let label = squashed_text(cells[0]);
            let value = squashed_text(cells[1]);
            if !label.is_empty() && !value.is_empty() {
                pairs.push(LabelValue { label, value });
            }
        }
    }

    for term in document.select(&dt) {
        if let Some(definition) = term.next_siblings().find_map(ElementRef::wrap) {
            pairs.push(LabelValue {
                label: squashed_text(term),
                value: squashed_text(definition),
            });
        }
    }

    pairs
}

fn extract_bold_labels(document: &Html) -> Vec<BoldLabel> {
    let Ok(bold) = Selector::parse("b, strong") else {
        return Vec::new();
    };

    document
        .select(&bold)
        .map(|element| BoldLabel {
            label: squashed_text(element),
            context: element
                .parent()
                .and_then(ElementRef::wrap)
                .map(squashed_text)
                .unwrap_or_default(),
        })
        .collect()
}
