//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(holocron_db::DbError),

    #[error("Upstream error: {0}")]
    Proxy(#[from] holocron_proxy::ProxyError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream pagination exceeded {0} pages")]
    PageLimitExceeded(usize),

    #[error("Upstream pagination loops back to {0}")]
    PaginationCycle(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Sync cancelled")]
    Cancelled,
}

impl From<holocron_db::DbError> for CoreError {
    fn from(err: holocron_db::DbError) -> Self {
        match err {
            holocron_db::DbError::NotFound(msg) => CoreError::NotFound(msg),
            holocron_db::DbError::Duplicate(msg) => CoreError::Conflict(msg),
            other => CoreError::Database(other),
        }
    }
}

impl CoreError {
    /// Whether the failure came from the upstream side of a sync
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CoreError::Proxy(_)
                | CoreError::InvalidUrl(_)
                | CoreError::PageLimitExceeded(_)
                | CoreError::PaginationCycle(_)
        )
    }

    /// Whether retrying later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Proxy(e) => e.is_retryable(),
            CoreError::Timeout(_) => true,
            _ => false,
        }
    }
}
