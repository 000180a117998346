//! Activity log entry types for agent observability.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{generate_activity_id, now_ms};

/// Well-known agent identities appearing in activity entries
pub mod agents {
    pub const SCHEDULER: &str = "scheduler";
    pub const GATE: &str = "publishing-gate";
    pub const STRATEGIST: &str = "strategist";
    pub const CREATOR: &str = "creator";
    pub const ORCHESTRATOR: &str = "orchestrator";
    pub const RESEARCHER: &str = "researcher";
    pub const COPYWRITER: &str = "copywriter";
    pub const COMMENT_ENGINE: &str = "comment-engine";
    pub const TOKEN_MONITOR: &str = "token-monitor";
    pub const METRICS: &str = "metrics";
    pub const TRENDS: &str = "trends";
    pub const HUMAN: &str = "human";
}

/// Classification of an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Informational note (skips, deferrals)
    Info,
    /// A state-changing decision
    Action,
    /// One agent handing work to another
    Communication,
    /// A successful externally-visible outcome
    Result,
    /// A failure
    Error,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Info => "info",
            ActivityKind::Action => "action",
            ActivityKind::Communication => "communication",
            ActivityKind::Result => "result",
            ActivityKind::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(ActivityKind::Info),
            "action" => Some(ActivityKind::Action),
            "communication" => Some(ActivityKind::Communication),
            "result" => Some(ActivityKind::Result),
            "error" => Some(ActivityKind::Error),
            _ => None,
        }
    }
}

/// One entry per observable agent decision or external call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLogEntry {
    pub id: String,
    /// Originating agent
    pub from: String,
    /// Target agent, when the entry records a hand-off
    pub to: Option<String>,
    pub kind: ActivityKind,
    /// Human-readable description of what happened and why
    pub message: String,
    /// Entry-specific payload data
    pub payload: Value,
    pub created_at: i64,
}

impl AgentLogEntry {
    pub fn new(from: &str, to: Option<&str>, kind: ActivityKind, message: &str, payload: Value) -> Self {
        Self {
            id: generate_activity_id(),
            from: from.to_string(),
            to: to.map(|s| s.to_string()),
            kind,
            message: message.to_string(),
            payload,
            created_at: now_ms(),
        }
    }

    /// Informational entry (skipped publish, deferral, no-op)
    pub fn info(from: &str, message: &str) -> Self {
        Self::new(from, None, ActivityKind::Info, message, Value::Null)
    }

    /// State-changing action
    pub fn action(from: &str, message: &str, payload: Value) -> Self {
        Self::new(from, None, ActivityKind::Action, message, payload)
    }

    /// Agent-to-agent hand-off
    pub fn communication(from: &str, to: &str, message: &str) -> Self {
        Self::new(from, Some(to), ActivityKind::Communication, message, Value::Null)
    }

    /// Successful externally-visible outcome
    pub fn result(from: &str, message: &str, payload: Value) -> Self {
        Self::new(from, None, ActivityKind::Result, message, payload)
    }

    /// Failure entry
    pub fn error(from: &str, message: &str) -> Self {
        Self::new(from, None, ActivityKind::Error, message, Value::Null)
    }
}
