//! Event bus seam
//!
//! The wallet owns its event bus; walletpulse only subscribes to it.
//! [`LocalEventBus`] is a minimal synchronous in-process implementation used
//! by the replay CLI and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::types::{DomainEvent, EventKind};

/// Callback invoked synchronously for each published event.
pub type EventHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe surface walletpulse needs from the host.
pub trait EventBus: Send + Sync {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Synchronous in-process bus: `publish` runs matching handlers in
/// subscription order before returning.
#[derive(Default)]
pub struct LocalEventBus {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, EventKind, EventHandler)>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to its subscribers. Returns how many handlers ran.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        let kind = event.kind();
        // Handlers may subscribe or unsubscribe, so call them unlocked
        let matching: Vec<EventHandler> = self
            .lock()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in &matching {
            handler(event);
        }
        matching.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, EventKind, EventHandler)>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventBus for LocalEventBus {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, kind, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().retain(|(existing, _, _)| *existing != id);
    }
}
