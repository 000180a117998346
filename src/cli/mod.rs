//! CLI module for cadence - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for the daemon, manual
//! pipeline runs, and post moderation.

pub mod commands;

pub use commands::{Cli, Commands};
