//! Content Generation Oracle seam.
//!
//! The Oracle is an opaque text-in/text-out service. The crate never models
//! what it generates; it only classifies failures (transient rate limits vs
//! everything else) and extracts JSON from its free-text replies.

pub mod http;
pub mod parse;
pub mod retry;

pub use http::{HttpOracle, OracleConfig};
pub use parse::{extract_json, extract_typed};
pub use retry::{Retrier, Sleeper, TokioSleeper};

use async_trait::async_trait;
use std::time::Duration;

/// Stateless content-generation client. Each call is independent.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate free text for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Errors from Oracle calls
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl OracleError {
    /// Rate-limit signal: HTTP 429 or a message mentioning quota.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            OracleError::RateLimited { .. } => true,
            OracleError::ApiError { status, message } => {
                *status == 429 || message.to_lowercase().contains("quota")
            }
            _ => false,
        }
    }
}
