//! Wiring translators to the event bus
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  event   ┌─────────┐  emissions  ┌────────────┐
//! │ EventBus │ ───────► │ Tracker │ ──────────► │ Dispatcher │ ──► sinks
//! └──────────┘          └────┬────┘             └────────────┘
//!                            │ preference changes     ▲
//!                            ▼                        │
//!                     ┌───────────────┐               │
//!                     │ IdleScheduler │ ──────────────┘
//!                     └───────────────┘
//! ```
//!
//! [`track_app_events`] registers one handler per [`EventKind`] for the
//! lifetime of an account session. Handlers run synchronously inside the
//! bus callback except for `transactionSent`, which continues on a spawned
//! task while it waits for the network registry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let tracker = Tracker::new(translator, dispatcher);
//! let session = track_app_events(bus.clone(), tracker.clone());
//! // ... account session runs, events flow ...
//! drop(session); // unsubscribes every handler
//! ```

use std::sync::Arc;

use crate::bus::{EventBus, SubscriptionId};
use crate::dispatch::{ActivityMonitor, Dispatcher, Emission, IdleScheduler};
use crate::translate::Translator;
use crate::types::{DomainEvent, EventKind, PreferencesChanged, TransactionSent};

/// Translates events and dispatches the resulting records.
pub struct Tracker {
    translator: Arc<Translator>,
    dispatcher: Dispatcher,
    idle: IdleScheduler,
    activity: Arc<ActivityMonitor>,
}

impl Tracker {
    /// Must be called within a tokio runtime (starts the idle worker).
    pub fn new(translator: Translator, dispatcher: Dispatcher) -> Arc<Self> {
        let activity = ActivityMonitor::new();
        let idle = IdleScheduler::spawn(Arc::clone(&activity));

        Arc::new(Self {
            translator: Arc::new(translator),
            dispatcher,
            idle,
            activity,
        })
    }

    /// Handle one event, awaiting the network registry if needed.
    pub async fn handle(&self, event: DomainEvent) {
        let _busy = self.activity.enter();
        if let Some(transaction) = self.route(event) {
            self.finish_transaction(&transaction).await;
        }
    }

    /// Handle one event from a synchronous callback. A transaction continues
    /// on a spawned task; everything else completes before returning.
    pub fn handle_now(self: &Arc<Self>, event: DomainEvent) {
        let busy = self.activity.enter();
        if let Some(transaction) = self.route(event) {
            let tracker = Arc::clone(self);
            tokio::spawn(async move {
                let _busy = busy;
                tracker.finish_transaction(&transaction).await;
            });
        }
    }

    /// Defer `task` until no handler is in flight.
    pub fn on_idle<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.idle.on_idle(task);
    }

    /// Resolve once every idle task queued so far has run.
    pub async fn settled(&self) {
        self.idle.settled().await;
    }

    /// Handlers currently in flight
    pub fn in_flight(&self) -> usize {
        self.activity.in_flight()
    }

    /// Dispatch or defer everything that needs no suspension; hand back a
    /// transaction that still has to be translated.
    fn route(&self, event: DomainEvent) -> Option<TransactionSent> {
        match event {
            DomainEvent::TransactionSent(transaction) => Some(transaction),
            DomainEvent::PreferencesChanged(change) => {
                self.defer_preferences(change);
                None
            }
            other => {
                if let Some(emissions) = self.translator.translate_immediate(&other) {
                    self.dispatch_all(emissions);
                }
                None
            }
        }
    }

    async fn finish_transaction(&self, transaction: &TransactionSent) {
        let emissions = self.translator.transaction_sent(transaction).await;
        self.dispatch_all(emissions);
    }

    fn defer_preferences(&self, change: PreferencesChanged) {
        let translator = Arc::clone(&self.translator);
        let dispatcher = self.dispatcher.clone();
        self.idle.on_idle(move || {
            let emissions = translator.preferences_changed(&change);
            tracing::debug!(records = emissions.len(), "Dispatching deferred preference changes");
            for emission in emissions {
                dispatcher.dispatch_emission(emission);
            }
        });
    }

    fn dispatch_all(&self, emissions: Vec<Emission>) {
        for emission in emissions {
            self.dispatcher.dispatch_emission(emission);
        }
    }
}

/// Subscriptions held for one account session.
///
/// Dropping it unsubscribes every handler.
pub struct TrackingSession {
    bus: Arc<dyn EventBus>,
    subscriptions: Vec<SubscriptionId>,
}

impl TrackingSession {
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
        tracing::info!("Stopped tracking app events");
    }
}

/// Register a handler for every [`EventKind`] on `bus`.
pub fn track_app_events(bus: Arc<dyn EventBus>, tracker: Arc<Tracker>) -> TrackingSession {
    let subscriptions = EventKind::ALL
        .into_iter()
        .map(|kind| {
            let tracker = Arc::clone(&tracker);
            bus.subscribe(
                kind,
                Arc::new(move |event: &DomainEvent| tracker.handle_now(event.clone())),
            )
        })
        .collect::<Vec<_>>();

    tracing::info!(handlers = subscriptions.len(), "Tracking app events");

    TrackingSession { bus, subscriptions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalEventBus;
    use crate::dispatch::MemorySink;
    use crate::translate::test_support::translator;
    use crate::types::{DappConnection, GlobalPreferences, ScreenView};

    fn preferences_change() -> DomainEvent {
        let mut state = GlobalPreferences::default();
        state.provider_injection.insert("a.xyz".to_string(), true);
        DomainEvent::PreferencesChanged(PreferencesChanged {
            state,
            prev_state: GlobalPreferences::default(),
        })
    }

    #[tokio::test]
    async fn test_session_registers_every_kind() {
        let bus = Arc::new(LocalEventBus::new());
        let sink = Arc::new(MemorySink::new());
        let tracker = Tracker::new(translator(), Dispatcher::new(sink.clone()));

        let session = track_app_events(bus.clone(), tracker);
        assert_eq!(session.subscription_count(), EventKind::ALL.len());
        assert_eq!(bus.subscriber_count(), EventKind::ALL.len());

        drop(session);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_bus_events_are_dispatched_synchronously() {
        let bus = Arc::new(LocalEventBus::new());
        let sink = Arc::new(MemorySink::new());
        let tracker = Tracker::new(translator(), Dispatcher::new(sink.clone()));
        let _session = track_app_events(bus.clone(), tracker);

        bus.publish(&DomainEvent::ScreenView(ScreenView::default()));
        bus.publish(&DomainEvent::DappConnection(DappConnection::default()));

        let names: Vec<_> = sink.records().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["screen_view", "dapp_connection"]);
    }

    #[tokio::test]
    async fn test_preferences_wait_for_idle() {
        let sink = Arc::new(MemorySink::new());
        let tracker = Tracker::new(translator(), Dispatcher::new(sink.clone()));

        tracker.handle(preferences_change()).await;
        tracker.settled().await;

        let records = sink.named("metamask_mode");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("dapp_domain"), Some("a.xyz"));
    }

    #[tokio::test]
    async fn test_idle_tasks_wait_for_transactions() {
        let sink = Arc::new(MemorySink::new());
        let tracker = Tracker::new(translator(), Dispatcher::new(sink.clone()));

        tracker.handle_now(DomainEvent::TransactionSent(TransactionSent::default()));
        assert_eq!(tracker.in_flight(), 1);

        let observed = sink.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();
        tracker.on_idle(move || {
            let _ = tx.send(observed.named("signed_transaction").len());
        });

        assert_eq!(rx.await.unwrap(), 1);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_ended_session_stops_emission() {
        let bus = Arc::new(LocalEventBus::new());
        let sink = Arc::new(MemorySink::new());
        let tracker = Tracker::new(translator(), Dispatcher::new(sink.clone()));

        drop(track_app_events(bus.clone(), tracker));
        bus.publish(&DomainEvent::ScreenView(ScreenView::default()));

        assert!(sink.is_empty());
    }
}
