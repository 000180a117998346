//! Notification fan-out.
//!
//! The event sink is injected into constructors rather than living as a
//! global emitter, so the scheduling layer and the notification layer stay
//! decoupled. Live subscribers (a UI, a websocket bridge) implement
//! `EventSink`; the default sink only traces.

use crate::domain::Role;
use crate::error::Result;
use crate::store::SharedStore;
use std::sync::Arc;

/// One-way notification sink.
///
/// `user_id` is `None` for broadcast events (activity log fan-out).
pub trait EventSink: Send + Sync {
    fn emit(&self, user_id: Option<&str>, kind: &str, title: &str, message: &str);
}

/// Sink that only writes tracing events. Used when no subscriber is attached.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, user_id: Option<&str>, kind: &str, title: &str, message: &str) {
        tracing::info!(user_id, kind, title, message, "notification");
    }
}

/// Fans alerts out to every admin user via the injected sink.
pub struct Notifier {
    store: SharedStore,
    sink: Arc<dyn EventSink>,
}

impl Notifier {
    pub fn new(store: SharedStore, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Send one notification per admin user.
    pub fn notify_admins(&self, kind: &str, title: &str, message: &str) -> Result<()> {
        let admins = {
            let store = self.store.lock().expect("store lock poisoned");
            store.admins()?
        };

        for admin in &admins {
            debug_assert_eq!(admin.role, Role::Admin);
            self.sink.emit(Some(&admin.id), kind, title, message);
        }

        tracing::debug!(kind, recipients = admins.len(), "admin notification fan-out");
        Ok(())
    }

    /// Broadcast to live subscribers without a user target.
    pub fn broadcast(&self, kind: &str, title: &str, message: &str) {
        self.sink.emit(None, kind, title, message);
    }
}
