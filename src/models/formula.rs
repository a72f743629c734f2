//! Formula records, search queries and deep-search match results

use crate::error::{FormularyError, Result};
use serde::{Deserialize, Serialize};

/// A stored LaTeX expression plus its metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormulaRecord {
    /// Backend identifier, absent until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Display label
    pub name: String,

    /// Canonical LaTeX source; the only field searching looks at
    pub latex: String,

    /// Citation or URL
    #[serde(default)]
    pub source: String,

    /// Free-form notes, empty when the backend omits them
    #[serde(default)]
    pub description: String,
}

impl FormulaRecord {
    pub fn new(id: i64, name: impl Into<String>, latex: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            latex: latex.into(),
            source: String::new(),
            description: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Payload for creating a formula
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NewFormula {
    pub name: String,
    pub latex: String,
    pub source: String,
    pub description: String,
}

impl NewFormula {
    /// Reject payloads the backend would store as useless rows
    pub fn validate(&self) -> Result<()> {
        if self.latex.trim().is_empty() {
            return Err(FormularyError::EmptyInput(
                "formula LaTeX must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ephemeral search input, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub latex: String,
}

impl SearchQuery {
    pub fn new(latex: impl Into<String>) -> Self {
        Self { latex: latex.into() }
    }

    /// Record-shaped body the compare endpoint expects
    pub fn to_payload(&self) -> QueryPayload<'_> {
        QueryPayload {
            name: "",
            latex: &self.latex,
            source: "",
            description: "",
        }
    }
}

/// Wire body of a deep-search request: a formula with only `latex` filled in
#[derive(Debug, Serialize)]
pub struct QueryPayload<'a> {
    pub name: &'a str,
    pub latex: &'a str,
    pub source: &'a str,
    pub description: &'a str,
}

/// Position of a match reported by deep search
///
/// The backend may report either a bare offset or a `[start, end]` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MatchIndex {
    Offset(i64),
    Span(i64, i64),
}

impl MatchIndex {
    pub fn start(&self) -> i64 {
        match *self {
            MatchIndex::Offset(offset) => offset,
            MatchIndex::Span(start, _) => start,
        }
    }
}

/// One record of a deep-search response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    pub formula: FormulaRecord,

    /// Empty means the record did not match
    #[serde(default)]
    pub indexes: Vec<MatchIndex>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        !self.indexes.is_empty()
    }
}
