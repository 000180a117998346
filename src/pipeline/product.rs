//! Product pipeline: growth insights, researcher, copywriter.
//!
//! Picks trending products, writes persuasive copy for each with a rotating
//! technique, and persists the results as approved items with campaigns for
//! the comment engine. Higher trust than the daily pipeline, so no human
//! approval step.

use crate::activity::ActivityLog;
use crate::domain::{
    AgentLogEntry, ContentItem, ProductCampaign, ProductCandidate, agents, merge_candidates,
};
use crate::error::Result;
use crate::lifecycle::Lifecycle;
use crate::oracle::{Retrier, Sleeper, extract_typed};
use crate::pipeline::schedule_today_at_hour;
use crate::platform::ProductSource;
use crate::platform::products::CATEGORY_QUERIES;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Copy techniques cycled across items in one run.
pub const COPY_TECHNIQUES: [&str; 5] = [
    "scarcity",
    "social_proof",
    "authority",
    "urgency",
    "reciprocity",
];

/// Researcher keeps the top N candidates after merge.
const TOP_CANDIDATES: usize = 10;

/// Spacing between scheduled product posts.
const POST_SPACING_MINUTES: i64 = 90;

/// Fallback when the insights step errors.
const DEFAULT_PRODUCT_RATIO: f64 = 0.66;
const DEFAULT_BEST_HOUR: u32 = 9;

/// What one product run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRunSummary {
    pub candidates: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize)]
struct MixReply {
    product_ratio: f64,
    #[serde(default)]
    best_hours: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct CopyReply {
    message: String,
    #[serde(default)]
    hashtags: Vec<String>,
    reply_template: String,
}

/// The product pipeline orchestrator.
pub struct ProductPipeline {
    store: crate::store::SharedStore,
    lifecycle: Lifecycle,
    activity: ActivityLog,
    retrier: Arc<Retrier>,
    products: Arc<dyn ProductSource>,
    sleeper: Arc<dyn Sleeper>,
    /// Delay between successive Oracle calls, to respect upstream throughput.
    inter_call_delay: Duration,
}

impl ProductPipeline {
    pub fn new(
        store: crate::store::SharedStore,
        lifecycle: Lifecycle,
        activity: ActivityLog,
        retrier: Arc<Retrier>,
        products: Arc<dyn ProductSource>,
        sleeper: Arc<dyn Sleeper>,
        inter_call_delay: Duration,
    ) -> Self {
        Self {
            store,
            lifecycle,
            activity,
            retrier,
            products,
            sleeper,
            inter_call_delay,
        }
    }

    /// Run the full insights -> researcher -> copywriter sequence.
    pub async fn run(&self) -> Result<ProductRunSummary> {
        let (ratio, best_hour) = self.content_mix().await?;
        let posts_to_create = ((3.0 * ratio).round() as i64).clamp(1, 3) as usize;

        let candidates = self.research().await?;
        self.activity.record(AgentLogEntry::communication(
            agents::RESEARCHER,
            agents::COPYWRITER,
            &format!(
                "{} trending candidate(s), creating {} post(s)",
                candidates.len(),
                posts_to_create
            ),
        ))?;

        let mut summary = ProductRunSummary {
            candidates: candidates.len(),
            ..Default::default()
        };

        let first_slot = schedule_today_at_hour(best_hour);
        for (i, candidate) in candidates.iter().take(posts_to_create).enumerate() {
            if i > 0 {
                self.sleeper.sleep(self.inter_call_delay).await;
            }

            let technique = COPY_TECHNIQUES[i % COPY_TECHNIQUES.len()];
            let scheduled_for = first_slot + (i as i64) * POST_SPACING_MINUTES * 60_000;

            match self.write_one(candidate, technique, scheduled_for).await {
                Ok(item) => {
                    summary.created += 1;
                    tracing::info!(post_id = %item.id, product = %candidate.name, technique, "product post created");
                }
                Err(err) if err.is_per_item() => {
                    summary.failed += 1;
                    self.activity.record(AgentLogEntry::error(
                        agents::COPYWRITER,
                        &format!("copywriter failed for '{}': {}", candidate.name, err),
                    ))?;
                }
                Err(err) => return Err(err),
            }
        }

        self.activity.record(AgentLogEntry::result(
            agents::ORCHESTRATOR,
            &format!(
                "product run finished: {} created, {} failed from {} candidate(s)",
                summary.created, summary.failed, summary.candidates
            ),
            serde_json::json!({ "created": summary.created, "failed": summary.failed }),
        ))?;

        Ok(summary)
    }

    /// Growth-insights step. Any error falls back to the fixed default mix.
    async fn content_mix(&self) -> Result<(f64, u32)> {
        let prompt = "Recommend a content mix for a commerce page.\n\
                      Reply with JSON: {\"product_ratio\": 0.0-1.0, \"best_hours\": [9, 13]}";

        match self.mix_from_oracle(prompt).await {
            Ok(mix) => Ok(mix),
            Err(err) => {
                self.activity.record(AgentLogEntry::info(
                    agents::ORCHESTRATOR,
                    &format!("insights unavailable, using default mix: {}", err),
                ))?;
                Ok((DEFAULT_PRODUCT_RATIO, DEFAULT_BEST_HOUR))
            }
        }
    }

    async fn mix_from_oracle(&self, prompt: &str) -> Result<(f64, u32)> {
        let response = self.retrier.generate(prompt).await?;
        let mix: MixReply = extract_typed(&response)?;
        let ratio = mix.product_ratio.clamp(0.0, 1.0);
        let best_hour = mix.best_hours.first().copied().unwrap_or(DEFAULT_BEST_HOUR);
        Ok((ratio, best_hour))
    }

    /// Researcher step: fan out over category queries, merge, rank.
    async fn research(&self) -> Result<Vec<ProductCandidate>> {
        let mut batches = Vec::new();
        for query in CATEGORY_QUERIES {
            match self.products.trending(query).await {
                Ok(batch) => batches.push(batch),
                Err(err) => {
                    // A dead category feed should not sink the whole run.
                    self.activity.record(AgentLogEntry::error(
                        agents::RESEARCHER,
                        &format!("trending fetch failed for '{}': {}", query, err),
                    ))?;
                }
            }
        }
        Ok(merge_candidates(batches, TOP_CANDIDATES))
    }

    /// Copywriter step for one candidate.
    async fn write_one(
        &self,
        candidate: &ProductCandidate,
        technique: &str,
        scheduled_for: i64,
    ) -> Result<ContentItem> {
        let prompt = format!(
            "Write persuasive social copy for the product below using the '{}' technique.\n\
             Name: {}\nPrice: {:.2}\nDescription: {}\n\
             Reply with JSON: {{\"message\": \"...\", \"hashtags\": [...], \
             \"reply_template\": \"...\"}} where reply_template greets [NAME].",
            technique, candidate.name, candidate.price, candidate.description
        );

        let response = self.retrier.generate(&prompt).await?;
        let reply: CopyReply = extract_typed(&response)?;

        let item = ContentItem::new_approved(
            &candidate.name,
            &reply.message,
            reply.hashtags,
            scheduled_for,
        );
        self.lifecycle.create(&item, agents::COPYWRITER)?;

        let campaign =
            ProductCampaign::new(&item.id, candidate, &reply.message, &reply.reply_template);
        {
            let store = self.store.lock().expect("store lock poisoned");
            store.insert_campaign(&campaign)?;
        }
        Ok(item)
    }
}
