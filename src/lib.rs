//! # formulary
//!
//! Client library and CLI for a LaTeX formula manager backend. The core is an
//! incremental search coordinator that switches between client-side substring
//! filtering and the backend's structural index comparison, caching results
//! and ignoring stale responses.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formulary::{ApiClient, Config, SearchMode, SearchSession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default().apply_env()?;
//!     let client = Arc::new(ApiClient::new(&config.api)?);
//!
//!     // Start a search session over the backend
//!     let (mut handle, _task) = SearchSession::spawn(client, &config.search);
//!
//!     handle.set_mode(SearchMode::Deep).await?;
//!     handle.edit("\\frac{a}{b}").await?;
//!     let view = handle.wait_for(|view| !view.loading).await?;
//!
//!     for formula in &view.visible {
//!         println!("{}: {}", formula.name, formula.latex);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod import;
pub mod jobs;
pub mod loadable;
pub mod models;
pub mod search;
pub mod utils;

// Re-export main API types
pub use api::{ApiClient, ChatBackend, ChatSession, FormulaStore, JobApi, chat_interactive};
pub use config::Config;
pub use error::{FormularyError, Result};
pub use import::{PdfSource, export_png, import_pdf, import_screenshot};
pub use jobs::{JobBoard, wait_for_job};
pub use loadable::Loadable;

// Re-export commonly used types
pub use models::{FormulaRecord, Job, JobStatus, MatchResult, NewFormula, SearchQuery};
pub use search::{
    Normalization, SearchCoordinator, SearchHandle, SearchMode, SearchSession, SearchView,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_imports() {
        let config = Config::default();
        let coordinator = SearchCoordinator::new(&config.search);
        assert_eq!(coordinator.mode(), SearchMode::Shallow);
        assert_eq!(coordinator.normalization(), Normalization::AllWhitespace);
    }
}
