//! User directory entries and metrics reports
//!
//! Users exist only for notification fan-out (alerts go to every admin).
//! Metrics reports feed the strategist step.

use crate::id::{generate_report_id, now_ms};
use serde::{Deserialize, Serialize};

/// Role of a user in the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

/// A user that can receive notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// A daily metrics snapshot read by the strategist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub id: String,
    /// Aggregation period label, e.g. "day"
    pub period: String,
    pub followers: i64,
    pub engagement: f64,
    /// Free-text summary handed to the strategist prompt
    pub summary: String,
    pub created_at: i64,
}

impl MetricsReport {
    pub fn new(period: &str, followers: i64, engagement: f64, summary: &str) -> Self {
        Self {
            id: generate_report_id(),
            period: period.to_string(),
            followers,
            engagement,
            summary: summary.to_string(),
            created_at: now_ms(),
        }
    }
}
