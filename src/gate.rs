//! Publishing Gate.
//!
//! Runs once per publish-tick and decides whether the next eligible item may
//! go out now. At most one item is processed per tick, which bounds publish
//! throughput independently of the daily cap.

use crate::activity::ActivityLog;
use crate::domain::{AgentLogEntry, ContentItem, agents};
use crate::error::Result;
use crate::lifecycle::Lifecycle;
use crate::notify::Notifier;
use crate::platform::SocialPlatform;
use crate::store::SharedStore;
use chrono::{DateTime, Local};
use std::sync::Arc;

/// Hard limit on items published per calendar day.
pub const MAX_POSTS_PER_DAY: usize = 5;

/// Minimum hours between two consecutive published items.
pub const MIN_INTERVAL_HOURS: i64 = 2;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Publishing limits, overridable via config.
#[derive(Debug, Clone, Copy)]
pub struct GateLimits {
    pub max_posts_per_day: usize,
    pub min_interval_hours: i64,
}

impl Default for GateLimits {
    fn default() -> Self {
        Self {
            max_posts_per_day: MAX_POSTS_PER_DAY,
            min_interval_hours: MIN_INTERVAL_HOURS,
        }
    }
}

/// What one gate tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Nothing approved and due
    NoneDue,
    /// Daily cap reached, informational skip
    DailyCapReached,
    /// Too soon after the last publish; minutes remaining
    IntervalDeferred(i64),
    /// Item published (post id)
    Published(String),
    /// The attempted item failed (generic error)
    ItemFailed(String),
    /// Permission-class error; every approved item was batch-failed
    BatchFailed(usize),
}

/// The gate itself.
pub struct PublishingGate {
    store: SharedStore,
    lifecycle: Lifecycle,
    activity: ActivityLog,
    notifier: Arc<Notifier>,
    platform: Arc<dyn SocialPlatform>,
    limits: GateLimits,
}

impl PublishingGate {
    pub fn new(
        store: SharedStore,
        lifecycle: Lifecycle,
        activity: ActivityLog,
        notifier: Arc<Notifier>,
        platform: Arc<dyn SocialPlatform>,
        limits: GateLimits,
    ) -> Self {
        Self {
            store,
            lifecycle,
            activity,
            notifier,
            platform,
            limits,
        }
    }

    /// Run one publish tick at the current wall-clock time.
    pub async fn run_tick(&self) -> Result<GateOutcome> {
        let now = Local::now();
        self.run_tick_at(now.timestamp_millis(), local_midnight_ms(now))
            .await
    }

    /// Tick body with explicit time inputs.
    pub async fn run_tick_at(&self, now_ms: i64, midnight_ms: i64) -> Result<GateOutcome> {
        // 1-2. Earliest approved item that is due, or nothing to do.
        let item = {
            let store = self.store.lock().expect("store lock poisoned");
            store.next_due_approved(now_ms)?
        };
        let Some(item) = item else {
            return Ok(GateOutcome::NoneDue);
        };

        // 3. Daily cap.
        let published_today = {
            let store = self.store.lock().expect("store lock poisoned");
            store.count_published_since(midnight_ms)?
        };
        if published_today >= self.limits.max_posts_per_day {
            self.activity.record(AgentLogEntry::info(
                agents::GATE,
                &format!(
                    "daily cap reached ({}/{}), skipping '{}'",
                    published_today, self.limits.max_posts_per_day, item.topic
                ),
            ))?;
            return Ok(GateOutcome::DailyCapReached);
        }

        // 4. Minimum interval since the last publish.
        let last_published = {
            let store = self.store.lock().expect("store lock poisoned");
            store.latest_published_at()?
        };
        if let Some(last) = last_published {
            let elapsed_ms = now_ms - last;
            let min_ms = self.limits.min_interval_hours * MS_PER_HOUR;
            if elapsed_ms < min_ms {
                let remaining_mins = (min_ms - elapsed_ms) / 60_000;
                self.activity.record(AgentLogEntry::info(
                    agents::GATE,
                    &format!(
                        "min interval not elapsed, deferring '{}' for {} more minute(s)",
                        item.topic, remaining_mins
                    ),
                ))?;
                return Ok(GateOutcome::IntervalDeferred(remaining_mins));
            }
        }

        // 5-6. Publish and classify the outcome.
        self.publish(item, now_ms).await
    }

    async fn publish(&self, item: ContentItem, now_ms: i64) -> Result<GateOutcome> {
        let result = match &item.media_url {
            Some(url) => self.platform.publish_media_post(&item.message, url).await,
            None => self.platform.publish_post(&item.message).await,
        };

        match result {
            Ok(platform_id) => {
                self.lifecycle.mark_published(&item.id, now_ms, &platform_id)?;
                self.notifier.notify_admins(
                    "publish",
                    "Post published",
                    &format!("'{}' is live ({})", item.topic, platform_id),
                )?;
                Ok(GateOutcome::Published(item.id))
            }
            Err(err) if err.is_permission() => {
                // Retrying other approved items would hit the same wall.
                let failed = self.lifecycle.fail_all_approved(&err.to_string())?;
                self.notifier.notify_admins(
                    "alert",
                    "Publishing credential rejected",
                    &format!(
                        "{} approved item(s) failed; credential lacks publishing scope",
                        failed
                    ),
                )?;
                Ok(GateOutcome::BatchFailed(failed))
            }
            Err(err) => {
                self.lifecycle.mark_failed(&item.id, &err.to_string())?;
                Ok(GateOutcome::ItemFailed(item.id))
            }
        }
    }
}

/// Midnight of the local calendar day containing `now`, in unix ms.
pub fn local_midnight_ms(now: DateTime<Local>) -> i64 {
    let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN);
    midnight
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis() - now.timestamp_millis() % (24 * MS_PER_HOUR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PostStatus, Role, User};
    use crate::notify::testing::RecordingSink;
    use crate::platform::PlatformError;
    use crate::platform::testing::MockPlatform;
    use crate::store::Store;

    struct Fixture {
        gate: PublishingGate,
        store: SharedStore,
        platform: Arc<MockPlatform>,
        sink: Arc<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().unwrap().into_shared();
        let sink = Arc::new(RecordingSink::default());
        let activity = ActivityLog::new(store.clone(), sink.clone());
        let lifecycle = Lifecycle::new(store.clone(), activity.clone());
        let notifier = Arc::new(Notifier::new(store.clone(), sink.clone()));
        let platform = Arc::new(MockPlatform::new());

        store
            .lock()
            .unwrap()
            .upsert_user(&User {
                id: "admin-1".to_string(),
                name: "Admin".to_string(),
                role: Role::Admin,
            })
            .unwrap();

        Fixture {
            gate: PublishingGate::new(
                store.clone(),
                lifecycle,
                activity,
                notifier,
                platform.clone(),
                GateLimits::default(),
            ),
            store,
            platform,
            sink,
        }
    }

    fn insert_approved(store: &SharedStore, topic: &str, scheduled_for: i64) -> ContentItem {
        let item = ContentItem::new_approved(topic, "message", vec![], scheduled_for);
        store.lock().unwrap().insert_post(&item).unwrap();
        item
    }

    fn insert_published(store: &SharedStore, published_at: i64) {
        let mut item = ContentItem::new_approved("old", "m", vec![], 0);
        item.status = PostStatus::Published;
        item.published_at = Some(published_at);
        store.lock().unwrap().insert_post(&item).unwrap();
    }

    const HOUR: i64 = MS_PER_HOUR;

    #[tokio::test]
    async fn test_no_due_items_is_noop() {
        let f = fixture();
        insert_approved(&f.store, "future", 10 * HOUR);

        let outcome = f.gate.run_tick_at(HOUR, 0).await.unwrap();
        assert_eq!(outcome, GateOutcome::NoneDue);
        assert_eq!(f.platform.publish_count(), 0);
    }

    #[tokio::test]
    async fn test_publishes_earliest_due_item() {
        let f = fixture();
        insert_approved(&f.store, "later", 2 * HOUR);
        let earliest = insert_approved(&f.store, "earliest", HOUR);

        let outcome = f.gate.run_tick_at(3 * HOUR, 0).await.unwrap();
        assert_eq!(outcome, GateOutcome::Published(earliest.id.clone()));
        assert_eq!(f.platform.publish_count(), 1);

        let store = f.store.lock().unwrap();
        let item = store.get_post(&earliest.id).unwrap().unwrap();
        assert_eq!(item.status, PostStatus::Published);
        assert_eq!(item.published_at, Some(3 * HOUR));
        // The platform's own id is kept for the comment engine's join
        assert_eq!(item.platform_post_id.as_deref(), Some("platform-1"));
    }

    #[tokio::test]
    async fn test_one_item_per_tick() {
        let f = fixture();
        insert_approved(&f.store, "a", HOUR);
        insert_approved(&f.store, "b", HOUR);

        f.gate.run_tick_at(5 * HOUR, 0).await.unwrap();
        assert_eq!(f.platform.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_daily_cap_blocks_sixth_publish() {
        let f = fixture();
        // 5 already published today
        for i in 0..5 {
            insert_published(&f.store, HOUR * (i + 1));
        }
        insert_approved(&f.store, "sixth", HOUR);

        let before = f.store.lock().unwrap().recent_activity(100).unwrap().len();
        let outcome = f.gate.run_tick_at(20 * HOUR, 0).await.unwrap();

        assert_eq!(outcome, GateOutcome::DailyCapReached);
        assert_eq!(f.platform.publish_count(), 0);

        // Exactly one informational log entry
        let activity = f.store.lock().unwrap().recent_activity(100).unwrap();
        assert_eq!(activity.len(), before + 1);
        assert!(activity[0].message.contains("daily cap"));
    }

    #[tokio::test]
    async fn test_cap_counts_only_today() {
        let f = fixture();
        // 5 published yesterday (before midnight)
        for i in 0..5 {
            insert_published(&f.store, -(HOUR * (i + 1)));
        }
        insert_approved(&f.store, "today", HOUR);

        // midnight at 0; last publish was an hour before midnight, so the
        // interval check passes too
        let outcome = f.gate.run_tick_at(2 * HOUR, 0).await.unwrap();
        assert!(matches!(outcome, GateOutcome::Published(_)));
    }

    #[tokio::test]
    async fn test_interval_defers_within_two_hours() {
        let f = fixture();
        insert_published(&f.store, 10 * HOUR);
        insert_approved(&f.store, "next", HOUR);

        let outcome = f.gate.run_tick_at(11 * HOUR, 0).await.unwrap();
        assert_eq!(outcome, GateOutcome::IntervalDeferred(60));
        assert_eq!(f.platform.publish_count(), 0);

        let activity = f.store.lock().unwrap().recent_activity(10).unwrap();
        assert!(activity[0].message.contains("min interval"));
    }

    #[tokio::test]
    async fn test_interval_allows_after_two_hours() {
        let f = fixture();
        insert_published(&f.store, 10 * HOUR);
        insert_approved(&f.store, "next", HOUR);

        let outcome = f.gate.run_tick_at(12 * HOUR, 0).await.unwrap();
        assert!(matches!(outcome, GateOutcome::Published(_)));
    }

    #[tokio::test]
    async fn test_generic_failure_fails_only_attempted_item() {
        let f = fixture();
        let doomed = insert_approved(&f.store, "doomed", HOUR);
        let survivor = insert_approved(&f.store, "survivor", 2 * HOUR);
        f.platform.script_publish(Err(PlatformError::Api {
            status: 500,
            message: "flaky".to_string(),
        }));

        let outcome = f.gate.run_tick_at(5 * HOUR, 0).await.unwrap();
        assert_eq!(outcome, GateOutcome::ItemFailed(doomed.id.clone()));

        let store = f.store.lock().unwrap();
        assert_eq!(store.get_post(&doomed.id).unwrap().unwrap().status, PostStatus::Failed);
        assert_eq!(
            store.get_post(&survivor.id).unwrap().unwrap().status,
            PostStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_permission_failure_batch_fails_all_approved() {
        let f = fixture();
        insert_approved(&f.store, "a", HOUR);
        insert_approved(&f.store, "b", 2 * HOUR);
        insert_approved(&f.store, "c", 3 * HOUR);
        f.platform
            .script_publish(Err(PlatformError::Permission("no publish scope".to_string())));

        let outcome = f.gate.run_tick_at(5 * HOUR, 0).await.unwrap();
        assert_eq!(outcome, GateOutcome::BatchFailed(3));

        let store = f.store.lock().unwrap();
        assert!(store.list_posts_by_status(PostStatus::Approved).unwrap().is_empty());
        assert_eq!(store.list_posts_by_status(PostStatus::Failed).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_next_tick_after_batch_fail_is_noop() {
        let f = fixture();
        insert_approved(&f.store, "a", HOUR);
        f.platform
            .script_publish(Err(PlatformError::Permission("no scope".to_string())));

        f.gate.run_tick_at(5 * HOUR, 0).await.unwrap();
        let outcome = f.gate.run_tick_at(6 * HOUR, 0).await.unwrap();
        assert_eq!(outcome, GateOutcome::NoneDue);
        assert_eq!(f.platform.publish_count(), 0);
    }

    #[tokio::test]
    async fn test_success_notifies_admins() {
        let f = fixture();
        insert_approved(&f.store, "hello", HOUR);

        f.gate.run_tick_at(5 * HOUR, 0).await.unwrap();

        let events = f.sink.events.lock().unwrap();
        assert!(
            events
                .iter()
                .any(|(user, kind, _, _)| user.as_deref() == Some("admin-1") && kind == "publish")
        );
    }

    #[tokio::test]
    async fn test_media_item_uses_media_publish() {
        let f = fixture();
        let item = ContentItem::new_approved("pic", "caption", vec![], HOUR)
            .with_media("https://cdn.example.com/x.png");
        f.store.lock().unwrap().insert_post(&item).unwrap();

        f.gate.run_tick_at(5 * HOUR, 0).await.unwrap();

        let published = f.platform.published.lock().unwrap();
        assert_eq!(published[0].1.as_deref(), Some("https://cdn.example.com/x.png"));
    }

    #[test]
    fn test_local_midnight_is_start_of_day() {
        let now = Local::now();
        let midnight = local_midnight_ms(now);
        assert!(midnight <= now.timestamp_millis());
        assert!(now.timestamp_millis() - midnight < 24 * HOUR);
    }
}
