//! API layer for formulary
//!
//! This module provides the backend capability traits, the HTTP client that
//! implements them, and the assistant chat session.

pub mod backend;
pub mod chat;
pub mod client;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main API types
pub use backend::{ChatBackend, FormulaStore, JobApi};
pub use chat::{ChatSession, chat_interactive};
pub use client::ApiClient;
