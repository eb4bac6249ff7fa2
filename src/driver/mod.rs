//! Browser automation abstraction
//!
//! The crawler talks to the browser only through [`BrowserDriver`]. Every DOM
//! question or mutation is a value of [`Probe`], [`Read`] or [`Action`], scoped
//! to one frame and resolved through a [`Locator`]. The Chromium driver turns
//! these values into in-page scripts (see [`scripts`]); tests interpret them
//! against an in-memory site.

pub mod chromium;
pub mod scripts;

pub use chromium::ChromiumDriver;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identity of a document context at the time it was listed
///
/// Frame ids are not stable across navigations: a reload may replace a frame
/// with a new one. Holders must be ready for [`DriverError::FrameDetached`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameId(String);

impl FrameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State an element must reach for a selector probe to succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementState {
    /// Present in the document
    Attached,
    /// Present and rendered with a non-empty box
    Visible,
}

/// Accessible role used by role-based lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Button,
    Link,
}

/// How to find one element inside a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Locator {
    /// First element matching a CSS selector
    Css { css: String },

    /// First `<select>` offering an option with this caption
    /// (case and accent insensitive)
    SelectWithOption { option: String },

    /// Submit control whose caption equals the text
    Submit { caption: String },

    /// Element with the role and accessible name
    Role { role: Role, name: String },

    /// Innermost element whose trimmed text equals the text exactly
    Text { text: String },

    /// The n-th detail-like link of the result list
    DetailLink { index: usize },
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css { css: css.into() }
    }

    pub fn select_with_option(option: impl Into<String>) -> Self {
        Self::SelectWithOption {
            option: option.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "css `{}`", css),
            Self::SelectWithOption { option } => write!(f, "select offering '{}'", option),
            Self::Submit { caption } => write!(f, "submit '{}'", caption),
            Self::Role { role, name } => write!(f, "{:?} '{}'", role, name),
            Self::Text { text } => write!(f, "text '{}'", text),
            Self::DetailLink { index } => write!(f, "detail link #{}", index),
        }
    }
}

/// A yes/no question about a frame's document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Probe {
    /// An element matches the selector and reached the state
    Selector { css: String, state: ElementState },

    /// The locator resolves to an element
    Exists { locator: Locator },

    /// Some select in this document offers the option
    OptionInFrame { option: String },

    /// Some select in this document or any same-origin nested frame offers the option
    OptionInTree { option: String },

    /// At least one link looks like a detail link
    ListReady,

    /// A back-navigation control is present
    DetailReady {
        back_selector: String,
        back_text: String,
    },
}

/// Structured data read from a frame's document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Read {
    /// Caption of the selected option of a select (string)
    SelectedText { locator: Locator },

    /// Trimmed captions of every anchor with an href (array of strings)
    PageAnchors,

    /// Number of detail-like links (number)
    DetailLinkCount,

    /// Raw label/value corpus of a detail view (`DetailSnapshot`)
    DetailSnapshot,

    /// Frame location plus every detail link target (string); changes when
    /// another result page is shown
    ListFingerprint,
}

/// A mutation of a frame's document
///
/// Every value change dispatches `change` and `input` and then blurs the
/// control, so listeners bound to either event fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Action {
    /// Select the option whose caption matches (case and accent insensitive)
    SelectByText { select: Locator, text: String },

    /// Select the first option whose caption contains the text
    /// (case and accent insensitive)
    SelectByPartialText { select: Locator, text: String },

    /// Select the option with this value attribute
    SelectByValue { select: Locator, value: String },

    /// Force every select offering `option` to it, except the listed controls
    ResetSelects { option: String, except: Vec<Locator> },

    /// Click every enabled, unchecked checkbox
    CheckAllCheckboxes,

    /// Scroll the element into view and click it
    Click { locator: Locator },

    /// Call a global page function if it is defined
    CallFunction { name: String },
}

/// Errors raised by a browser driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Frame {0} is no longer attached")]
    FrameDetached(FrameId),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Browser connection closed")]
    Closed,

    #[error("DevTools protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// The browser automation collaborator
///
/// One driver owns one page. Calls are sequential: the crawler never issues two
/// operations at once.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the page to a URL
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Wait until the top document finished parsing
    async fn wait_for_load(&self, timeout: Duration) -> DriverResult<()>;

    /// Every frame of the page, main frame first
    async fn frames(&self) -> DriverResult<Vec<FrameId>>;

    /// The page's top-level frame
    async fn main_frame(&self) -> DriverResult<FrameId>;

    /// URL of the top-level document
    async fn current_url(&self) -> DriverResult<String>;

    /// Evaluates a probe in a frame
    async fn probe(&self, frame: &FrameId, probe: &Probe) -> DriverResult<bool>;

    /// Evaluates a read in a frame
    async fn read(&self, frame: &FrameId, read: &Read) -> DriverResult<serde_json::Value>;

    /// Performs an action in a frame; `false` means its target was not found
    async fn perform(&self, frame: &FrameId, action: &Action) -> DriverResult<bool>;

    /// Resolves once the browser window is gone
    async fn closed(&self);

    /// Shuts the browser down
    async fn close(&self) -> DriverResult<()>;
}
