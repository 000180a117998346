//! Daily autonomous pipeline: strategist then creator.
//!
//! The strategist reads yesterday's metrics and the last published topics,
//! asks the Oracle for a plan, and hands each planned topic to the creator.
//! Output items are drafts; a human approves them before the gate will touch
//! them.

use crate::activity::ActivityLog;
use crate::domain::{AgentLogEntry, ContentItem, DailyStrategy, RawStrategy, agents};
use crate::error::Result;
use crate::id::now_ms;
use crate::lifecycle::Lifecycle;
use crate::oracle::{Retrier, extract_typed};
use crate::pipeline::schedule_today;
use crate::store::SharedStore;
use serde::Deserialize;
use std::sync::Arc;

/// How many recently published topics the strategist sees.
const RECENT_TOPIC_WINDOW: usize = 10;

/// What one daily run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyRunSummary {
    pub planned: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize)]
struct CreatorReply {
    message: String,
    #[serde(default)]
    hashtags: Vec<String>,
}

/// The pipeline coordinator for the daily run.
pub struct DailyPipeline {
    store: SharedStore,
    lifecycle: Lifecycle,
    activity: ActivityLog,
    retrier: Arc<Retrier>,
}

impl DailyPipeline {
    pub fn new(
        store: SharedStore,
        lifecycle: Lifecycle,
        activity: ActivityLog,
        retrier: Arc<Retrier>,
    ) -> Self {
        Self {
            store,
            lifecycle,
            activity,
            retrier,
        }
    }

    /// Run the full strategist -> creator sequence.
    pub async fn run(&self) -> Result<DailyRunSummary> {
        let strategy = self.plan().await?;

        self.activity.record(AgentLogEntry::communication(
            agents::STRATEGIST,
            agents::CREATOR,
            &format!(
                "plan: {} post(s) on [{}]",
                strategy.posts_to_create,
                strategy.topics.join(", ")
            ),
        ))?;

        let mut summary = DailyRunSummary {
            planned: strategy.posts_to_create,
            ..Default::default()
        };

        // Topics created earlier in this run also count as "recent" for the
        // later ones, so a single run never repeats itself.
        let mut recent_topics = self.recent_topics()?;

        for i in 0..strategy.posts_to_create {
            let topic = &strategy.topics[i];
            let focus = &strategy.focus_types[i];

            match self.create_one(topic, focus, &recent_topics, &strategy.scheduled_times[i]).await
            {
                Ok(item) => {
                    recent_topics.push(topic.clone());
                    summary.created += 1;
                    tracing::info!(post_id = %item.id, topic = %topic, "draft created");
                }
                Err(err) if err.is_per_item() => {
                    summary.failed += 1;
                    self.activity.record(AgentLogEntry::error(
                        agents::CREATOR,
                        &format!("creator failed for '{}': {}", topic, err),
                    ))?;
                }
                Err(err) => return Err(err),
            }
        }

        self.activity.record(AgentLogEntry::result(
            agents::STRATEGIST,
            &format!(
                "daily run finished: {} created, {} failed of {} planned",
                summary.created, summary.failed, summary.planned
            ),
            serde_json::json!({
                "created": summary.created,
                "failed": summary.failed,
            }),
        ))?;

        Ok(summary)
    }

    /// Manual generate-and-schedule. The caller asked for this item, so it
    /// lands Approved and becomes eligible for the next publishing tick.
    pub async fn generate_now(&self, topic: &str) -> Result<ContentItem> {
        let recent = self.recent_topics()?;
        let reply = self.compose(topic, "engagement", &recent).await?;

        let item = ContentItem::new_approved(
            topic,
            &reply.message,
            reply.hashtags,
            now_ms() + 60 * 60 * 1000,
        );
        self.lifecycle.create(&item, agents::HUMAN)?;

        self.activity.record(AgentLogEntry::result(
            agents::CREATOR,
            &format!("manual post created for '{}'", topic),
            serde_json::json!({ "post_id": item.id }),
        ))?;
        Ok(item)
    }

    /// Strategist step: metrics + recent topics in, sanitized strategy out.
    async fn plan(&self) -> Result<DailyStrategy> {
        let (metrics_summary, recent) = {
            let store = self.store.lock().expect("store lock poisoned");
            let metrics = store
                .latest_metrics()?
                .map(|m| m.summary)
                .unwrap_or_else(|| "no metrics available yet".to_string());
            (metrics, store.recent_published_topics(RECENT_TOPIC_WINDOW)?)
        };

        let prompt = format!(
            "You plan social media content for today.\n\
             Latest metrics: {}\n\
             Recently published topics (avoid repeats): {}\n\
             Reply with JSON: {{\"posts_to_create\": 1-3, \"topics\": [...], \
             \"scheduled_times\": [\"HH:MM\", ...], \"focus_types\": [...], \
             \"reasoning\": \"...\"}}",
            metrics_summary,
            recent.join(", ")
        );

        let response = self.retrier.generate(&prompt).await?;
        let raw: RawStrategy = extract_typed(&response)?;
        Ok(DailyStrategy::sanitize(raw))
    }

    /// Creator step for a single topic.
    async fn create_one(
        &self,
        topic: &str,
        focus: &str,
        recent_topics: &[String],
        time_of_day: &str,
    ) -> Result<ContentItem> {
        let reply = self.compose(topic, focus, recent_topics).await?;

        let item = ContentItem::new_draft(
            topic,
            &reply.message,
            reply.hashtags,
            schedule_today(time_of_day),
        );
        self.lifecycle.create(&item, agents::CREATOR)?;
        Ok(item)
    }

    async fn compose(
        &self,
        topic: &str,
        focus: &str,
        recent_topics: &[String],
    ) -> Result<CreatorReply> {
        let prompt = format!(
            "Write a social media post about '{}' with focus '{}'.\n\
             Do not repeat these recent topics: {}\n\
             Reply with JSON: {{\"message\": \"...\", \"hashtags\": [\"#...\"]}}",
            topic,
            focus,
            recent_topics.join(", ")
        );

        let response = self.retrier.generate(&prompt).await?;
        Ok(extract_typed(&response)?)
    }

    fn recent_topics(&self) -> Result<Vec<String>> {
        let store = self.store.lock().expect("store lock poisoned");
        store.recent_published_topics(RECENT_TOPIC_WINDOW)
    }
}
