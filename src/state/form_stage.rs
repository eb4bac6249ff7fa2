/// Form stage definitions
///
/// The search form is a two-state machine that ends once the result list shows.
use std::fmt;

/// Represents the current stage of the search form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormStage {
    /// Location selection (state, city, checkboxes)
    Stage1,

    /// Property type and price band selection
    Stage2,

    /// The result list was submitted and rendered
    ResultsReady,
}

impl FormStage {
    /// Returns true once the form no longer needs driving
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ResultsReady)
    }

    /// The stage reached by submitting this one
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Stage1 => Some(Self::Stage2),
            Self::Stage2 => Some(Self::ResultsReady),
            Self::ResultsReady => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stage1 => "stage-1",
            Self::Stage2 => "stage-2",
            Self::ResultsReady => "results-ready",
        }
    }
}

impl fmt::Display for FormStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
