//! Post Lifecycle Manager.
//!
//! Sole owner of content-item status transitions. Every mutation goes
//! through here, is checked against the allowed edges, and produces exactly
//! one activity log entry.

use crate::activity::ActivityLog;
use crate::domain::{AgentLogEntry, ContentItem, PostStatus, agents};
use crate::error::{CadenceError, Result};
use crate::store::SharedStore;

/// Enforces the content-item state machine over the store.
#[derive(Clone)]
pub struct Lifecycle {
    store: SharedStore,
    activity: ActivityLog,
}

impl Lifecycle {
    pub fn new(store: SharedStore, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    /// Persist a freshly created item (Draft or Approved depending on the
    /// trust level of its creator).
    pub fn create(&self, item: &ContentItem, created_by: &str) -> Result<()> {
        {
            let store = self.store.lock().expect("store lock poisoned");
            store.insert_post(item)?;
        }
        self.activity.record(AgentLogEntry::action(
            created_by,
            &format!("created {} item '{}'", item.status.as_str(), item.topic),
            serde_json::json!({ "post_id": item.id, "status": item.status.as_str() }),
        ))?;
        Ok(())
    }

    /// Human approval: Draft -> Approved, sets the schedule.
    pub fn approve(&self, id: &str, scheduled_for: i64) -> Result<ContentItem> {
        let item = self.transition(id, PostStatus::Approved, |item| {
            item.scheduled_for = scheduled_for;
        })?;
        self.activity.record(AgentLogEntry::action(
            agents::HUMAN,
            &format!("approved '{}' for publishing", item.topic),
            serde_json::json!({ "post_id": item.id, "scheduled_for": scheduled_for }),
        ))?;
        Ok(item)
    }

    /// Human rejection: Draft -> Rejected.
    pub fn reject(&self, id: &str) -> Result<ContentItem> {
        let item = self.transition(id, PostStatus::Rejected, |_| {})?;
        self.activity.record(AgentLogEntry::action(
            agents::HUMAN,
            &format!("rejected '{}'", item.topic),
            serde_json::json!({ "post_id": item.id }),
        ))?;
        Ok(item)
    }

    /// Platform confirmed success: Approved -> Published. Records the id the
    /// platform assigned so the comment engine can join posts back later.
    pub fn mark_published(
        &self,
        id: &str,
        published_at: i64,
        platform_post_id: &str,
    ) -> Result<ContentItem> {
        let item = self.transition(id, PostStatus::Published, |item| {
            item.published_at = Some(published_at);
            item.platform_post_id = Some(platform_post_id.to_string());
        })?;
        self.activity.record(AgentLogEntry::result(
            agents::GATE,
            &format!("published '{}'", item.topic),
            serde_json::json!({
                "post_id": item.id,
                "platform_post_id": platform_post_id,
                "published_at": published_at,
            }),
        ))?;
        Ok(item)
    }

    /// Publish attempt errored: Approved -> Failed.
    pub fn mark_failed(&self, id: &str, reason: &str) -> Result<ContentItem> {
        let item = self.transition(id, PostStatus::Failed, |_| {})?;
        self.activity.record(AgentLogEntry::error(
            agents::GATE,
            &format!("publish failed for '{}': {}", item.topic, reason),
        ))?;
        Ok(item)
    }

    /// Batch-fail every currently Approved item after a permission-class
    /// error. Retrying item by item would hit the same wall; one operation,
    /// one high-severity log entry.
    pub fn fail_all_approved(&self, reason: &str) -> Result<usize> {
        let approved = {
            let store = self.store.lock().expect("store lock poisoned");
            let approved = store.list_posts_by_status(PostStatus::Approved)?;
            for item in &approved {
                let mut failed = item.clone();
                failed.status = PostStatus::Failed;
                store.update_post(&failed)?;
            }
            approved
        };

        self.activity.record(AgentLogEntry::error(
            agents::GATE,
            &format!(
                "permission error: batch-failed {} approved item(s): {}",
                approved.len(),
                reason
            ),
        ))?;
        Ok(approved.len())
    }

    fn transition(
        &self,
        id: &str,
        next: PostStatus,
        mutate: impl FnOnce(&mut ContentItem),
    ) -> Result<ContentItem> {
        let store = self.store.lock().expect("store lock poisoned");
        let mut item = store
            .get_post(id)?
            .ok_or_else(|| CadenceError::PostNotFound(id.to_string()))?;

        if !item.status.can_transition_to(next) {
            return Err(CadenceError::InvalidTransition(format!(
                "{} -> {} for post {}",
                item.status.as_str(),
                next.as_str(),
                id
            )));
        }

        item.status = next;
        mutate(&mut item);
        store.update_post(&item)?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::store::Store;
    use std::sync::Arc;

    fn lifecycle() -> (Lifecycle, SharedStore) {
        let store = Store::open_in_memory().unwrap().into_shared();
        let activity = ActivityLog::new(store.clone(), Arc::new(RecordingSink::default()));
        (Lifecycle::new(store.clone(), activity), store)
    }

    fn draft(store: &SharedStore) -> ContentItem {
        let item = ContentItem::new_draft("topic", "message", vec![], 100);
        store.lock().unwrap().insert_post(&item).unwrap();
        item
    }

    fn approved(store: &SharedStore) -> ContentItem {
        let item = ContentItem::new_approved("topic", "message", vec![], 100);
        store.lock().unwrap().insert_post(&item).unwrap();
        item
    }

    #[test]
    fn test_approve_draft_sets_schedule() {
        let (lifecycle, store) = lifecycle();
        let item = draft(&store);

        let approved = lifecycle.approve(&item.id, 5_000).unwrap();
        assert_eq!(approved.status, PostStatus::Approved);
        assert_eq!(approved.scheduled_for, 5_000);
    }

    #[test]
    fn test_reject_draft() {
        let (lifecycle, store) = lifecycle();
        let item = draft(&store);

        let rejected = lifecycle.reject(&item.id).unwrap();
        assert_eq!(rejected.status, PostStatus::Rejected);
    }

    #[test]
    fn test_mark_published_sets_timestamp_and_platform_id() {
        let (lifecycle, store) = lifecycle();
        let item = approved(&store);

        let published = lifecycle.mark_published(&item.id, 7_000, "ext-42").unwrap();
        assert_eq!(published.status, PostStatus::Published);
        assert_eq!(published.published_at, Some(7_000));
        assert_eq!(published.platform_post_id.as_deref(), Some("ext-42"));

        let found = store.lock().unwrap().post_by_platform_id("ext-42").unwrap().unwrap();
        assert_eq!(found.id, item.id);
    }

    #[test]
    fn test_cannot_approve_published_item() {
        let (lifecycle, store) = lifecycle();
        let item = approved(&store);
        lifecycle.mark_published(&item.id, 7_000, "ext-1").unwrap();

        let err = lifecycle.approve(&item.id, 9_000).unwrap_err();
        assert!(matches!(err, CadenceError::InvalidTransition(_)));
    }

    #[test]
    fn test_cannot_reject_approved_item() {
        let (lifecycle, store) = lifecycle();
        let item = approved(&store);

        let err = lifecycle.reject(&item.id).unwrap_err();
        assert!(matches!(err, CadenceError::InvalidTransition(_)));
    }

    #[test]
    fn test_cannot_publish_draft_directly() {
        let (lifecycle, store) = lifecycle();
        let item = draft(&store);

        let err = lifecycle.mark_published(&item.id, 7_000, "ext-1").unwrap_err();
        assert!(matches!(err, CadenceError::InvalidTransition(_)));
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let (lifecycle, _store) = lifecycle();
        let err = lifecycle.approve("missing", 0).unwrap_err();
        assert!(matches!(err, CadenceError::PostNotFound(_)));
    }

    #[test]
    fn test_fail_all_approved_batch() {
        let (lifecycle, store) = lifecycle();
        let a = approved(&store);
        let b = approved(&store);
        let d = draft(&store);
        let published = approved(&store);
        lifecycle.mark_published(&published.id, 1, "ext-1").unwrap();

        let count = lifecycle.fail_all_approved("no publish scope").unwrap();
        assert_eq!(count, 2);

        let store = store.lock().unwrap();
        assert_eq!(store.get_post(&a.id).unwrap().unwrap().status, PostStatus::Failed);
        assert_eq!(store.get_post(&b.id).unwrap().unwrap().status, PostStatus::Failed);
        // Drafts and published items are untouched
        assert_eq!(store.get_post(&d.id).unwrap().unwrap().status, PostStatus::Draft);
        assert_eq!(
            store.get_post(&published.id).unwrap().unwrap().status,
            PostStatus::Published
        );
    }

    #[test]
    fn test_every_transition_logs_one_entry() {
        let (lifecycle, store) = lifecycle();
        let item = draft(&store);

        let before = store.lock().unwrap().recent_activity(100).unwrap().len();
        lifecycle.approve(&item.id, 1_000).unwrap();
        let after = store.lock().unwrap().recent_activity(100).unwrap().len();
        assert_eq!(after, before + 1);
    }
}
