//! Search key normalization
//!
//! Both the query and every stored `latex` string are reduced to a key before
//! substring comparison: lowercase, with whitespace stripped per policy.

use crate::error::{FormularyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whitespace policy applied when building search keys
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Remove every whitespace character
    #[default]
    AllWhitespace,

    /// Remove only the first ASCII space, as the web front-end did
    FirstSpace,
}

impl FromStr for Normalization {
    type Err = FormularyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all" | "all_whitespace" => Ok(Normalization::AllWhitespace),
            "first" | "first_space" => Ok(Normalization::FirstSpace),
            other => Err(FormularyError::Config(format!(
                "Unknown normalization '{}', expected 'all_whitespace' or 'first_space'",
                other
            ))),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::AllWhitespace => f.write_str("all_whitespace"),
            Normalization::FirstSpace => f.write_str("first_space"),
        }
    }
}

/// Build the comparison key for `s`
pub fn normalize_key(s: &str, policy: Normalization) -> String {
    let lowered = s.to_lowercase();
    match policy {
        Normalization::AllWhitespace => lowered.chars().filter(|c| !c.is_whitespace()).collect(),
        Normalization::FirstSpace => lowered.replacen(' ', "", 1),
    }
}
