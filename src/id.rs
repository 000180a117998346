//! ID generation utilities for Cadence
//!
//! Provides functions for generating unique identifiers for posts, campaigns,
//! and activity log entries.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// Generate a unique post ID
///
/// Format: `post-{timestamp_ms}-{random_hex}`
/// Example: `post-1738300800123-a1b2`
pub fn generate_post_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("post-{}-{:04x}", timestamp, random)
}

/// Generate a unique campaign ID
///
/// Format: `camp-{timestamp_ms}-{random_hex}`
pub fn generate_campaign_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("camp-{}-{:04x}", timestamp, random)
}

/// Generate an activity log entry ID
///
/// Format: `act-{timestamp_ms}-{random_hex}`
pub fn generate_activity_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("act-{}-{:04x}", timestamp, random)
}

/// Generate a metrics report ID
///
/// Format: `rep-{timestamp_ms}-{random_hex}`
pub fn generate_report_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("rep-{}-{:04x}", timestamp, random)
}
