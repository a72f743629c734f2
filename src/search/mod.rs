//! Formula search for formulary
//!
//! The [`SearchCoordinator`] keeps the list of visible formulas consistent with
//! the current search term under two strategies: shallow substring filtering of
//! the cached formula list, and deep search delegated to the backend. The
//! [`SearchSession`] drives a coordinator from a stream of user events.

pub mod coordinator;
pub mod highlight;
pub mod normalize;
pub mod session;

// Re-export main types and functions
pub use coordinator::{
    Applied, DeepTicket, ListTicket, SearchCoordinator, deep_filter, derive_visible,
    shallow_filter,
};
pub use highlight::{Segment, highlight, render_marked};
pub use normalize::{Normalization, normalize_key};
pub use session::{SearchEvent, SearchHandle, SearchSession};

use crate::error::{FormularyError, Result};
use crate::models::FormulaRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which source the visible list is derived from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Client-side substring filter over the cached formula list
    #[default]
    Shallow,

    /// Backend index comparison
    Deep,
}

impl SearchMode {
    pub fn toggled(self) -> Self {
        match self {
            SearchMode::Shallow => SearchMode::Deep,
            SearchMode::Deep => SearchMode::Shallow,
        }
    }
}

impl FromStr for SearchMode {
    type Err = FormularyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shallow" => Ok(SearchMode::Shallow),
            "deep" => Ok(SearchMode::Deep),
            other => Err(FormularyError::InvalidInput(format!(
                "Unknown search mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Shallow => f.write_str("shallow"),
            SearchMode::Deep => f.write_str("deep"),
        }
    }
}

/// Snapshot handed to presentation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchView {
    pub term: String,
    pub mode: SearchMode,

    /// Derived result list, empty while loading or after a failure
    pub visible: Vec<FormulaRecord>,

    /// A request feeding the current view is in flight
    pub loading: bool,

    /// Failure of the request feeding the current view
    pub error: Option<String>,
}
