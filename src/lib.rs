//! Cadence - an agent-driven content scheduler and publisher
//!
//! Cadence plans, writes, moderates, and publishes social media content on a
//! schedule: periodic jobs feed a post lifecycle whose only exit to the
//! outside world is the publishing gate.

pub mod activity;
pub mod cli;
pub mod comments;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod error;
pub mod gate;
pub mod id;
pub mod jobs;
pub mod lifecycle;
pub mod notify;
pub mod oracle;
pub mod pipeline;
pub mod platform;
pub mod scheduler;
pub mod store;
pub mod token_monitor;

pub use error::{CadenceError, Result};
