//! Search session state
//!
//! This module makes the crawl's progress explicit instead of leaving it
//! implicit in browser calls.
//!
//! # Components
//!
//! - `FormStage`: where the search form stands (stage 1, stage 2, results ready)
//! - `SearchSession`: target URL, filters actually applied and discovered pages
//! - `FormField`: a control identified by the text of one of its options

mod form_stage;
mod session;

// Re-export main types
pub use form_stage::FormStage;
pub use session::{AppliedFilter, FormField, SearchSession};
