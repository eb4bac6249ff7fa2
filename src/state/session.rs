use super::FormStage;
use crate::driver::{FrameId, Locator};
use crate::text::normalize_label;
use std::fmt;

/// A form control identified by the text of one of its options
///
/// Controls on the target form have no stable ids, and the same caption may
/// show up in more than one frame. A field is therefore a locator plus the
/// normalized option captions it is expected to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Human-readable name used in logs and errors
    pub name: String,

    /// How the control is found inside its frame
    pub locator: Locator,

    /// Frame the control was found in when it was last touched
    pub containing_frame: Option<FrameId>,

    /// Normalized option captions that identify the control
    pub option_matchers: Vec<String>,

    /// Caption of the value that was applied
    pub current_value: Option<String>,
}

impl FormField {
    /// A field located by one of its option captions
    pub fn by_option(name: impl Into<String>, option: &str) -> Self {
        Self {
            name: name.into(),
            locator: Locator::select_with_option(option),
            containing_frame: None,
            option_matchers: vec![normalize_label(option)],
            current_value: None,
        }
    }

    /// A field located by a CSS selector
    pub fn by_css(name: impl Into<String>, css: &str) -> Self {
        Self {
            name: name.into(),
            locator: Locator::css(css),
            containing_frame: None,
            option_matchers: Vec::new(),
            current_value: None,
        }
    }

    /// Adds an option caption the control is expected to offer
    pub fn with_matcher(mut self, option: &str) -> Self {
        let normalized = normalize_label(option);
        if !self.option_matchers.contains(&normalized) {
            self.option_matchers.push(normalized);
        }
        self
    }

    /// Returns true if the caption matches one of the field's option matchers
    pub fn matches(&self, caption: &str) -> bool {
        let caption = normalize_label(caption);
        self.option_matchers.iter().any(|m| *m == caption)
    }

    /// Records where and to what the field was set
    pub fn applied(mut self, frame: &FrameId, value: impl Into<String>) -> Self {
        self.containing_frame = Some(frame.clone());
        self.current_value = Some(value.into());
        self
    }
}

/// One field setting that was actually applied, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFilter {
    pub stage: FormStage,
    pub field: FormField,
}

impl fmt::Display for AppliedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} = '{}'",
            self.stage,
            self.field.name,
            self.field.current_value.as_deref().unwrap_or("")
        )
    }
}

/// End-to-end state of one crawl
#[derive(Debug, Clone)]
pub struct SearchSession {
    target_url: String,
    stage: FormStage,
    applied_filters: Vec<AppliedFilter>,
    discovered_page_indices: Vec<u32>,
    current_page_index: Option<u32>,
}

impl SearchSession {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            stage: FormStage::Stage1,
            applied_filters: Vec::new(),
            discovered_page_indices: Vec::new(),
            current_page_index: None,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn stage(&self) -> FormStage {
        self.stage
    }

    /// Moves the form to its next stage and returns the new stage
    ///
    /// Advancing past `ResultsReady` leaves the stage unchanged.
    pub fn advance(&mut self) -> FormStage {
        if let Some(next) = self.stage.next() {
            tracing::debug!("Form stage {} -> {}", self.stage, next);
            self.stage = next;
        }
        self.stage
    }

    /// Records a field setting under the current stage
    pub fn record_filter(&mut self, field: FormField) {
        let applied = AppliedFilter {
            stage: self.stage,
            field,
        };
        tracing::info!("Applied {}", applied);
        self.applied_filters.push(applied);
    }

    /// Every applied filter in application order
    pub fn applied_filters(&self) -> &[AppliedFilter] {
        &self.applied_filters
    }

    /// The last value applied to the named field
    pub fn applied_value(&self, name: &str) -> Option<&str> {
        self.applied_filters
            .iter()
            .rev()
            .find(|a| a.field.name == name)
            .and_then(|a| a.field.current_value.as_deref())
    }

    /// Stores the page indices, ascending and without duplicates
    pub fn set_page_indices(&mut self, mut indices: Vec<u32>) {
        indices.sort_unstable();
        indices.dedup();
        self.discovered_page_indices = indices;
    }

    pub fn page_indices(&self) -> &[u32] {
        &self.discovered_page_indices
    }

    pub fn set_current_page(&mut self, index: u32) {
        self.current_page_index = Some(index);
    }

    pub fn current_page(&self) -> Option<u32> {
        self.current_page_index
    }
}
