//! Record dispatch and idle scheduling
//!
//! Dispatch is fire-and-forget: a [`RecordSink`] accepts a record and owns
//! everything after that (delivery, failures). Callers never observe the
//! outcome.
//!
//! Low-priority work (the preference change fan-out) is deferred with
//! [`IdleScheduler::on_idle`]. Idle tasks run in submission order, each one
//! once no event handler is in flight according to the shared
//! [`ActivityMonitor`]. They are not ordered with respect to records
//! dispatched synchronously by later events, and they cannot be cancelled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, Notify};

use crate::record::AnalyticsRecord;

// ============================================
// Sinks
// ============================================

/// Destination for built records.
pub trait RecordSink: Send + Sync {
    /// Hand a record over for delivery. Must not block on I/O.
    fn send(&self, name: &str, record: AnalyticsRecord);
}

/// Which sink an emission is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Primary metrics endpoint
    Metrics,
    /// Secondary product analytics endpoint
    Product,
}

/// A record a translator wants delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub sink: SinkKind,
    pub name: String,
    pub record: AnalyticsRecord,
}

impl Emission {
    /// A metrics record, sent under its own `request_name`.
    pub fn metrics(record: AnalyticsRecord) -> Self {
        Self {
            sink: SinkKind::Metrics,
            name: record.request_name().to_string(),
            record,
        }
    }

    /// A product analytics record, sent under a product event name.
    pub fn product(name: &str, record: AnalyticsRecord) -> Self {
        Self {
            sink: SinkKind::Product,
            name: name.to_string(),
            record,
        }
    }
}

/// Forwards records to the configured sinks.
#[derive(Clone)]
pub struct Dispatcher {
    metrics: Arc<dyn RecordSink>,
    product: Option<Arc<dyn RecordSink>>,
}

impl Dispatcher {
    pub fn new(metrics: Arc<dyn RecordSink>) -> Self {
        Self {
            metrics,
            product: None,
        }
    }

    pub fn with_product_sink(mut self, product: Arc<dyn RecordSink>) -> Self {
        self.product = Some(product);
        self
    }

    pub fn has_product_sink(&self) -> bool {
        self.product.is_some()
    }

    /// Forward a record to the metrics sink.
    pub fn dispatch(&self, name: &str, record: AnalyticsRecord) {
        tracing::debug!(name, "Dispatching record");
        self.metrics.send(name, record);
    }

    /// Route an emission to its sink. Product emissions are dropped when no
    /// product sink is configured.
    pub fn dispatch_emission(&self, emission: Emission) {
        match emission.sink {
            SinkKind::Metrics => self.dispatch(&emission.name, emission.record),
            SinkKind::Product => match &self.product {
                Some(product) => {
                    tracing::debug!(name = %emission.name, "Dispatching product record");
                    product.send(&emission.name, emission.record);
                }
                None => {
                    tracing::trace!(name = %emission.name, "No product sink configured");
                }
            },
        }
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(String, AnalyticsRecord)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records received so far, in arrival order.
    pub fn records(&self) -> Vec<(String, AnalyticsRecord)> {
        self.lock().clone()
    }

    /// Records received under `name`.
    pub fn named(&self, name: &str) -> Vec<AnalyticsRecord> {
        self.lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return everything received so far.
    pub fn take(&self) -> Vec<(String, AnalyticsRecord)> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, AnalyticsRecord)>> {
        // A panic while holding the lock cannot leave the Vec half-written
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordSink for MemorySink {
    fn send(&self, name: &str, record: AnalyticsRecord) {
        self.lock().push((name.to_string(), record));
    }
}

// ============================================
// Activity and idle scheduling
// ============================================

/// Counts event handlers currently in flight.
#[derive(Debug, Default)]
pub struct ActivityMonitor {
    busy: AtomicUsize,
    notify: Notify,
}

impl ActivityMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a handler as running until the guard is dropped.
    pub fn enter(self: &Arc<Self>) -> ActivityGuard {
        self.busy.fetch_add(1, Ordering::SeqCst);
        ActivityGuard {
            monitor: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Resolve once no handler is in flight.
    pub async fn wait_idle(&self) {
        loop {
            // Register before checking so a concurrent exit cannot be missed
            let notified = self.notify.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

/// Keeps the [`ActivityMonitor`] busy while alive.
#[derive(Debug)]
pub struct ActivityGuard {
    monitor: Arc<ActivityMonitor>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        if self.monitor.busy.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.monitor.notify.notify_waiters();
        }
    }
}

type IdleTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs deferred callbacks when the host is idle.
#[derive(Debug, Clone)]
pub struct IdleScheduler {
    tx: mpsc::UnboundedSender<IdleTask>,
}

impl IdleScheduler {
    /// Start the idle worker on the current tokio runtime.
    pub fn spawn(activity: Arc<ActivityMonitor>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<IdleTask>();

        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                activity.wait_idle().await;
                task();
            }
            tracing::debug!("Idle worker stopped");
        });

        Self { tx }
    }

    /// Defer `task` until no handler is in flight.
    pub fn on_idle<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(task)).is_err() {
            tracing::warn!("Idle worker is gone, dropping deferred task");
        }
    }

    /// Resolve once every task deferred before this call has run.
    pub async fn settled(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.on_idle(move || {
            let _ = done_tx.send(());
        });
        let _ = done_rx.await;
    }
}
