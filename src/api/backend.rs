//! Backend capabilities consumed by formulary components
//!
//! The search coordinator, job board and chat session only see these traits;
//! [`ApiClient`](super::ApiClient) implements all of them over HTTP.

use crate::error::Result;
use crate::models::{ChatMessage, FormulaRecord, Job, MatchResult, NewFormula, SearchQuery};
use async_trait::async_trait;

/// Authoritative store of formula records
#[async_trait]
pub trait FormulaStore: Send + Sync {
    /// Fetch every stored formula
    async fn list_formulas(&self) -> Result<Vec<FormulaRecord>>;

    /// Fetch one formula by id
    async fn get_formula(&self, id: i64) -> Result<FormulaRecord>;

    /// Persist a new formula
    async fn create_formula(&self, formula: &NewFormula) -> Result<()>;

    /// Ask the backend where `query` occurs in every stored formula
    async fn compare_indexes(&self, query: &SearchQuery) -> Result<Vec<MatchResult>>;
}

/// Background import job tracking
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Unarchived jobs
    async fn list_jobs(&self) -> Result<Vec<Job>>;

    async fn job_status(&self, id: i64) -> Result<Job>;

    async fn archive_job(&self, id: i64) -> Result<()>;
}

/// Assistant chat endpoint
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the whole transcript, get the assistant's reply
    async fn send_transcript(&self, transcript: &[ChatMessage]) -> Result<String>;
}
