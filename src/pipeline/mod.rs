//! Content-generation pipelines.
//!
//! Two shapes: the daily autonomous pipeline (strategist then creator,
//! drafts needing approval) and the product pipeline (insights, researcher,
//! copywriter, approved directly). Both isolate per-item failures so one bad
//! Oracle reply never aborts the remaining items.

pub mod daily;
pub mod product;

pub use daily::{DailyPipeline, DailyRunSummary};
pub use product::{ProductPipeline, ProductRunSummary};

use chrono::{Local, NaiveTime, TimeZone};

/// Resolve "HH:MM" against today's local date; falls back to noon on
/// unparseable input.
pub fn schedule_today(time_of_day: &str) -> i64 {
    let time = NaiveTime::parse_from_str(time_of_day.trim(), "%H:%M")
        .unwrap_or_else(|_| NaiveTime::from_hms_opt(12, 0, 0).expect("noon is valid"));
    let date = Local::now().date_naive();
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| Local::now().timestamp_millis())
}

/// Today's local date at the given hour, in unix ms.
pub fn schedule_today_at_hour(hour: u32) -> i64 {
    schedule_today(&format!("{:02}:00", hour.min(23)))
}
