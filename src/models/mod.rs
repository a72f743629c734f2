//! Wire and domain types shared by every formulary component
//!
//! These mirror the JSON documents exchanged with the formula backend.

pub mod chat;
pub mod formula;
pub mod job;

// Re-export main types
pub use chat::{ChatMessage, Role};
pub use formula::{FormulaRecord, MatchIndex, MatchResult, NewFormula, QueryPayload, SearchQuery};
pub use job::{Job, JobAction, JobStatus};
