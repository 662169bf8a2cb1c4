//! # walletpulse-core
//!
//! Core library for walletpulse - wallet event analytics.
//!
//! This library provides:
//! - Domain event types published by the wallet's event bus
//! - Translation of events into flat analytics records
//! - Dispatch to a metrics sink and an optional product analytics sink
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Events:** Typed [`DomainEvent`]s from the wallet's [`bus::EventBus`]
//! - **Translation:** [`Translator`] applies per-event rules, reading wallet
//!   state through the [`Collaborators`] seams
//! - **Dispatch:** [`Dispatcher`] routes each record to its [`dispatch::RecordSink`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use walletpulse_core::bus::LocalEventBus;
//! use walletpulse_core::record::{RecordBuilder, SystemClock};
//! use walletpulse_core::{
//!     track_app_events, Collaborators, Config, Dispatcher, MemorySink, Tracker, Translator,
//!     WalletSnapshot,
//! };
//!
//! # async fn run() {
//! let config = Config::load().expect("failed to load config");
//! let translator = Translator::new(
//!     Collaborators::from_snapshot(Arc::new(WalletSnapshot::new())),
//!     RecordBuilder::new(config.app.client_info(), Arc::new(SystemClock)),
//!     &config.app.origin,
//! );
//!
//! let bus = Arc::new(LocalEventBus::new());
//! let tracker = Tracker::new(translator, Dispatcher::new(Arc::new(MemorySink::new())));
//! let _session = track_app_events(bus, tracker);
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use dispatch::{Dispatcher, Emission, MemorySink, SinkKind};
pub use error::{Error, Result};
pub use record::AnalyticsRecord;
pub use snapshot::WalletSnapshot;
pub use tracker::{track_app_events, Tracker, TrackingSession};
pub use translate::{Collaborators, Translator};
pub use transport::{HttpSink, MetricsClient};
pub use types::*;

// Public modules
pub mod bus;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod provider;
pub mod record;
pub mod snapshot;
pub mod tracker;
pub mod translate;
pub mod transport;
pub mod types;
