//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: start the scheduler daemon
//! - generate: create and schedule one post on a given topic
//! - engine/products/comments: trigger one pipeline run now
//! - approve/reject: moderate drafted posts
//! - posts/activity/token-status: inspect state

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cadence - agent-driven content scheduler and publisher
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler daemon in the foreground
    Run,

    /// Generate one post on a topic and schedule it for publishing
    Generate {
        /// Topic to write about
        topic: String,
    },

    /// Run the daily content pipeline now
    Engine,

    /// Run the product cycle now
    Products,

    /// Run one comment engine pass now
    Comments,

    /// Approve a drafted post for publishing
    Approve {
        /// Post ID to approve
        id: String,

        /// Schedule for today at "HH:MM" (default: now)
        #[arg(short, long)]
        at: Option<String>,
    },

    /// Reject a drafted post
    Reject {
        /// Post ID to reject
        id: String,
    },

    /// List posts
    Posts {
        /// Filter by status (draft, approved, published, failed, rejected)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show recent activity log entries
    Activity {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Check the platform access token
    TokenStatus,
}
