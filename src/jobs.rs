//! Standalone periodic jobs: metrics snapshot and weekly trends.
//!
//! Smaller than the pipelines, no fan-out. The metrics job feeds the
//! strategist's next run; the trends job leaves a research note in the
//! activity log for the next product cycle.

use crate::activity::ActivityLog;
use crate::domain::{AgentLogEntry, MetricsReport, agents};
use crate::error::Result;
use crate::oracle::Retrier;
use crate::platform::SocialPlatform;
use crate::store::SharedStore;
use std::sync::Arc;

/// Daily metrics snapshot: page info + day insights into one report row.
pub struct MetricsJob {
    store: SharedStore,
    activity: ActivityLog,
    platform: Arc<dyn SocialPlatform>,
}

impl MetricsJob {
    pub fn new(
        store: SharedStore,
        activity: ActivityLog,
        platform: Arc<dyn SocialPlatform>,
    ) -> Self {
        Self {
            store,
            activity,
            platform,
        }
    }

    pub async fn run(&self) -> Result<MetricsReport> {
        let info = self.platform.get_page_info().await?;
        let insights = self.platform.get_page_insights("day").await?;

        let summary = format!(
            "{} followers, {:.1}% engagement, {} impressions today",
            info.followers, insights.engagement, insights.impressions
        );
        let report = MetricsReport::new("day", info.followers, insights.engagement, &summary);

        {
            let store = self.store.lock().expect("store lock poisoned");
            store.insert_metrics(&report)?;
        }

        self.activity.record(AgentLogEntry::result(
            agents::METRICS,
            &format!("daily metrics captured: {}", report.summary),
            serde_json::json!({ "report_id": report.id, "followers": report.followers }),
        ))?;

        Ok(report)
    }
}

/// Weekly trends research: asks the Oracle what is moving and hands the
/// answer to the strategist via the activity log.
pub struct TrendsJob {
    activity: ActivityLog,
    retrier: Arc<Retrier>,
}

impl TrendsJob {
    pub fn new(activity: ActivityLog, retrier: Arc<Retrier>) -> Self {
        Self { activity, retrier }
    }

    pub async fn run(&self) -> Result<String> {
        let prompt = "Summarize this week's consumer and social media trends \
                      relevant to a commerce brand, in 5 short bullet points.";
        let trends = self.retrier.generate(prompt).await?;

        self.activity.record(AgentLogEntry::communication(
            agents::TRENDS,
            agents::STRATEGIST,
            &format!("weekly trends: {}", trends),
        ))?;

        Ok(trends)
    }
}
