//! Error types for formulary
//!
//! This module provides the error taxonomy shared by the backend client, the
//! search coordinator, job tracking and import/export operations.

use thiserror::Error;

/// Main error type for formulary operations
#[derive(Error, Debug)]
pub enum FormularyError {
    /// Request never produced a response (connection refused, DNS, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body did not match the expected JSON shape
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Required input (file, URL, LaTeX text) was missing
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Input was present but unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Polling deadline exceeded
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed base or endpoint URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(String),
}

/// Result type alias for formulary operations
pub type Result<T> = std::result::Result<T, FormularyError>;

impl FormularyError {
    /// True for failures a user can fix by simply re-triggering the action.
    pub fn is_transient(&self) -> bool {
        match self {
            FormularyError::Network(_) | FormularyError::Timeout(_) => true,
            FormularyError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FormularyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FormularyError::UnexpectedShape(err.to_string())
        } else if let Some(status) = err.status() {
            FormularyError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_timeout() {
            FormularyError::Timeout(err.to_string())
        } else {
            FormularyError::Network(err.to_string())
        }
    }
}

impl From<anyhow::Error> for FormularyError {
    fn from(err: anyhow::Error) -> Self {
        FormularyError::Generic(err.to_string())
    }
}
