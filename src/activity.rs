//! Activity Log: append-only record of agent decisions.
//!
//! Every state-changing or externally-visible action produces exactly one
//! entry. Entries are persisted and then fanned out to live subscribers
//! through the injected sink.

use crate::domain::AgentLogEntry;
use crate::error::Result;
use crate::notify::EventSink;
use crate::store::SharedStore;
use std::sync::Arc;

/// Persists agent log entries and forwards them to subscribers.
#[derive(Clone)]
pub struct ActivityLog {
    store: SharedStore,
    sink: Arc<dyn EventSink>,
}

impl ActivityLog {
    pub fn new(store: SharedStore, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Record one entry: persist first, then fan out.
    pub fn record(&self, entry: AgentLogEntry) -> Result<()> {
        {
            let store = self.store.lock().expect("store lock poisoned");
            store.append_activity(&entry)?;
        }

        tracing::debug!(
            from = %entry.from,
            to = entry.to.as_deref(),
            kind = entry.kind.as_str(),
            message = %entry.message,
            "activity"
        );
        self.sink.emit(None, "activity", entry.kind.as_str(), &entry.message);
        Ok(())
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AgentLogEntry>> {
        let store = self.store.lock().expect("store lock poisoned");
        store.recent_activity(limit)
    }
}
