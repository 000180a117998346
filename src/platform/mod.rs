//! Social platform seam.
//!
//! Everything the core needs from the platform sits behind one trait. The
//! error type distinguishes permission-class failures, where the credential
//! lacks the publishing scope and retrying is futile, from generic ones.

pub mod http;
pub mod products;

pub use http::{HttpPlatform, PlatformConfig};
pub use products::{HttpProductSource, ProductSource};

use crate::domain::TokenStatus;
use async_trait::async_trait;

/// Errors from social platform calls
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Credential lacks a required scope. Batch-fail territory.
    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    pub fn is_permission(&self) -> bool {
        matches!(self, PlatformError::Permission(_))
    }
}

/// A post as fetched back from the platform
#[derive(Debug, Clone)]
pub struct PlatformPost {
    pub id: String,
    pub message: String,
    pub created_at: i64,
}

/// An inbound comment on a platform post
#[derive(Debug, Clone)]
pub struct PlatformComment {
    pub id: String,
    pub author_name: String,
    pub text: String,
}

/// Page-level profile numbers
#[derive(Debug, Clone)]
pub struct PageInfo {
    pub id: String,
    pub name: String,
    pub followers: i64,
}

/// Aggregated page insights for a period
#[derive(Debug, Clone)]
pub struct PageInsights {
    pub period: String,
    pub engagement: f64,
    pub impressions: i64,
}

/// The platform operations the core calls.
#[async_trait]
pub trait SocialPlatform: Send + Sync {
    /// Recent posts, newest first.
    async fn get_posts(&self, limit: usize) -> Result<Vec<PlatformPost>, PlatformError>;

    /// Comments on one post.
    async fn get_post_comments(&self, post_id: &str)
    -> Result<Vec<PlatformComment>, PlatformError>;

    /// Publish a text post. Returns the platform post id.
    async fn publish_post(&self, message: &str) -> Result<String, PlatformError>;

    /// Publish a post with attached media. Returns the platform post id.
    async fn publish_media_post(
        &self,
        message: &str,
        media_url: &str,
    ) -> Result<String, PlatformError>;

    /// Reply to a comment.
    async fn reply_to_comment(&self, comment_id: &str, message: &str)
    -> Result<(), PlatformError>;

    /// Remove a post.
    async fn delete_post(&self, post_id: &str) -> Result<(), PlatformError>;

    /// Page profile.
    async fn get_page_info(&self) -> Result<PageInfo, PlatformError>;

    /// Page insights for a period ("day", "week").
    async fn get_page_insights(&self, period: &str) -> Result<PageInsights, PlatformError>;

    /// Health of the access credential.
    async fn get_token_status(&self) -> Result<TokenStatus, PlatformError>;
}
