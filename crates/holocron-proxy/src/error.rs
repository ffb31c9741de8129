//! Proxy error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned error: {status} - {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProxyError {
    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProxyError::Timeout(_) => true,
            ProxyError::Http(e) => e.is_connect() || e.is_timeout(),
            ProxyError::UpstreamError { status, .. } => *status >= 500 || *status == 429,
            ProxyError::InvalidResponse(_) => false,
        }
    }
}
