//! Domain types for the agent orchestration core

pub mod activity;
pub mod campaign;
pub mod comment;
pub mod post;
pub mod strategy;
pub mod user;

pub use activity::{ActivityKind, AgentLogEntry, agents};
pub use campaign::{ProductCampaign, ProductCandidate, merge_candidates};
pub use comment::{CommentAction, CommentLog};
pub use post::{ContentItem, PostStatus};
pub use strategy::{DailyStrategy, RawStrategy, TokenBand, TokenStatus};
pub use user::{MetricsReport, Role, User};
