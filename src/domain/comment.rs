//! Comment reply log
//!
//! One row per inbound comment ever considered. The comment id is the
//! idempotency key: a comment with an existing row is never replied to again.

use crate::id::now_ms;
use serde::{Deserialize, Serialize};

/// What the Comment Response Engine decided to do with a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentAction {
    Replied,
    Ignored,
    Failed,
}

impl CommentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentAction::Replied => "replied",
            CommentAction::Ignored => "ignored",
            CommentAction::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "replied" => Some(CommentAction::Replied),
            "ignored" => Some(CommentAction::Ignored),
            "failed" => Some(CommentAction::Failed),
            _ => None,
        }
    }
}

/// Record of a handled comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentLog {
    /// Platform comment id (unique)
    pub comment_id: String,
    pub action: CommentAction,
    /// Reply text that was (or would have been) posted
    pub reply: String,
    pub created_at: i64,
}

impl CommentLog {
    pub fn new(comment_id: &str, action: CommentAction, reply: &str) -> Self {
        Self {
            comment_id: comment_id.to_string(),
            action,
            reply: reply.to_string(),
            created_at: now_ms(),
        }
    }
}
