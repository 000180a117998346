//! Content item (scheduled post) and its status state machine
//!
//! The ContentItem is the unit of work the whole pipeline revolves around:
//! created by the pipelines (or by a manual action), gated by the Publishing
//! Gate, and moved between statuses only through the edges encoded here.

use crate::id::{generate_post_id, now_ms};
use serde::{Deserialize, Serialize};

/// Status of a content item
///
/// Draft and Approved are the only non-terminal states. Published, Failed and
/// Rejected have no outbound edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Produced by the low-trust autonomous pipeline, awaiting human approval
    Draft,
    /// Cleared for publishing once its scheduled time arrives
    Approved,
    /// Confirmed live on the platform
    Published,
    /// Publish attempt errored, or batch-failed after a permission error
    Failed,
    /// Human rejected the draft
    Rejected,
}

impl PostStatus {
    /// Returns true if the status has no outbound transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PostStatus::Published | PostStatus::Failed | PostStatus::Rejected
        )
    }

    /// Whether the edge `self -> next` is allowed
    pub fn can_transition_to(&self, next: PostStatus) -> bool {
        matches!(
            (self, next),
            (PostStatus::Draft, PostStatus::Approved)
                | (PostStatus::Draft, PostStatus::Rejected)
                | (PostStatus::Approved, PostStatus::Published)
                | (PostStatus::Approved, PostStatus::Failed)
        )
    }

    /// Stable string form used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Approved => "approved",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
            PostStatus::Rejected => "rejected",
        }
    }

    /// Parse the storage string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "approved" => Some(PostStatus::Approved),
            "published" => Some(PostStatus::Published),
            "failed" => Some(PostStatus::Failed),
            "rejected" => Some(PostStatus::Rejected),
            _ => None,
        }
    }
}

/// A single piece of generated content with its publishing schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier ("post-{timestamp}-{hex}")
    pub id: String,

    /// Topic the item was generated for
    pub topic: String,

    /// Full message body to publish
    pub message: String,

    /// Hashtags, stored separately so templates can reuse them
    pub hashtags: Vec<String>,

    /// Optional media attachment URL
    pub media_url: Option<String>,

    /// Current lifecycle status
    pub status: PostStatus,

    /// When the item should be published (unix ms)
    pub scheduled_for: i64,

    /// When the item actually went live (unix ms, set on publish)
    pub published_at: Option<i64>,

    /// Id the platform assigned at publish time. The comment engine joins
    /// fetched posts back to campaigns through this.
    #[serde(default)]
    pub platform_post_id: Option<String>,

    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

impl ContentItem {
    /// Create a draft item (autonomous daily pipeline output; needs approval)
    pub fn new_draft(topic: &str, message: &str, hashtags: Vec<String>, scheduled_for: i64) -> Self {
        Self::new_with_status(topic, message, hashtags, scheduled_for, PostStatus::Draft)
    }

    /// Create an approved item (product pipeline or manual generate-and-schedule)
    pub fn new_approved(
        topic: &str,
        message: &str,
        hashtags: Vec<String>,
        scheduled_for: i64,
    ) -> Self {
        Self::new_with_status(topic, message, hashtags, scheduled_for, PostStatus::Approved)
    }

    fn new_with_status(
        topic: &str,
        message: &str,
        hashtags: Vec<String>,
        scheduled_for: i64,
        status: PostStatus,
    ) -> Self {
        Self {
            id: generate_post_id(),
            topic: topic.to_string(),
            message: message.to_string(),
            hashtags,
            media_url: None,
            status,
            scheduled_for,
            published_at: None,
            platform_post_id: None,
            created_at: now_ms(),
        }
    }

    /// Attach a media URL
    pub fn with_media(mut self, url: &str) -> Self {
        self.media_url = Some(url.to_string());
        self
    }

    /// Whether the item is due for publishing at `now` (unix ms)
    pub fn is_due(&self, now: i64) -> bool {
        self.status == PostStatus::Approved && self.scheduled_for <= now
    }
}
