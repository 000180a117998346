//! Daily strategy DTO and credential status
//!
//! The strategy is transient: parsed from an Oracle response, sanitized once
//! at this boundary, consumed by the daily pipeline, never persisted.

use serde::{Deserialize, Serialize};

/// Lower and upper bound on posts per daily run
pub const MIN_POSTS_PER_RUN: usize = 1;
pub const MAX_POSTS_PER_RUN: usize = 3;

/// What the strategist decided for today
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStrategy {
    pub posts_to_create: usize,
    pub topics: Vec<String>,
    /// Suggested times of day, "HH:MM"
    pub scheduled_times: Vec<String>,
    pub focus_types: Vec<String>,
    pub reasoning: String,
}

/// Raw shape as returned by the Oracle, before sanitization
#[derive(Debug, Clone, Deserialize)]
pub struct RawStrategy {
    #[serde(default)]
    pub posts_to_create: i64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub scheduled_times: Vec<String>,
    #[serde(default)]
    pub focus_types: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl DailyStrategy {
    /// Sanitize a raw Oracle strategy.
    ///
    /// `posts_to_create` is clamped into [1,3] and the three arrays are
    /// truncated (or padded with defaults) to exactly that length, whatever
    /// the Oracle returned.
    pub fn sanitize(raw: RawStrategy) -> Self {
        let n = (raw.posts_to_create.max(MIN_POSTS_PER_RUN as i64) as usize).min(MAX_POSTS_PER_RUN);

        let mut topics = raw.topics;
        topics.truncate(n);
        while topics.len() < n {
            topics.push("general".to_string());
        }

        let mut scheduled_times = raw.scheduled_times;
        scheduled_times.truncate(n);
        while scheduled_times.len() < n {
            scheduled_times.push("12:00".to_string());
        }

        let mut focus_types = raw.focus_types;
        focus_types.truncate(n);
        while focus_types.len() < n {
            focus_types.push("engagement".to_string());
        }

        Self {
            posts_to_create: n,
            topics,
            scheduled_times,
            focus_types,
            reasoning: raw.reasoning,
        }
    }
}

/// Health of the external publishing credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStatus {
    pub is_valid: bool,
    /// Expiry timestamp (unix ms), when known
    pub expires_at: Option<i64>,
    pub days_until_expiry: Option<i64>,
    pub scopes: Vec<String>,
}

/// Notification band the token status falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBand {
    /// Invalid or already expired
    Expired,
    /// Valid but expiring within 7 days
    Urgent,
    /// Valid but expiring within 15 days
    Advisory,
    /// Healthy, no notification
    Healthy,
}

impl TokenStatus {
    /// Classify into a notification band
    pub fn band(&self) -> TokenBand {
        if !self.is_valid {
            return TokenBand::Expired;
        }
        match self.days_until_expiry {
            Some(days) if days <= 7 => TokenBand::Urgent,
            Some(days) if days <= 15 => TokenBand::Advisory,
            _ => TokenBand::Healthy,
        }
    }
}
