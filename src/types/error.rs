//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! One `ContribError` enum covers I/O, storage, upstream collaborators
//! (GitHub, the LLM backend), and domain failures; the HTTP layer maps
//! each variant to a status code in one place.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContribError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Invalid GitHub repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Upstream Collaborators
    // -------------------------------------------------------------------------
    #[error("GitHub API error: {0}")]
    GithubApi(String),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Insight generation failed for one of the four operations.
    /// The backend-shaped cause (including schema mismatches) never
    /// crosses this boundary.
    #[error("Failed to generate {operation}")]
    Insight { operation: String },

    // -------------------------------------------------------------------------
    // Infrastructure
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ContribError {
    /// Create an insight failure for a named operation
    pub fn insight(operation: impl Into<String>) -> Self {
        Self::Insight {
            operation: operation.into(),
        }
    }

    /// HTTP status code for surfacing this error to API clients
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRepoUrl(_) | Self::MissingField(_) => 400,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }

    /// Check if this error is worth retrying at the queue layer.
    /// Input and not-found errors will fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidRepoUrl(_) | Self::MissingField(_) | Self::NotFound(_) | Self::Config(_)
        )
    }
}

impl From<reqwest::Error> for ContribError {
    fn from(err: reqwest::Error) -> Self {
        ContribError::GithubApi(err.to_string())
    }
}

impl From<r2d2::Error> for ContribError {
    fn from(err: r2d2::Error) -> Self {
        ContribError::Storage(format!("connection pool: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ContribError>;
