//! HTTP delivery to the metrics endpoint
//!
//! [`MetricsClient`] posts one record per request to
//! `{endpoint}/records/{name}`. [`HttpSink`] wraps it as a [`RecordSink`]:
//! records are queued on a channel and a background task posts them in
//! order. Failures are logged and counted, never retried.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::{mpsc, oneshot};

use crate::config::SinkConfig;
use crate::dispatch::RecordSink;
use crate::error::{Error, Result};
use crate::record::{AnalyticsRecord, ClientInfo};

/// HTTP client for a metrics endpoint
pub struct MetricsClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl MetricsClient {
    /// Create a new client from sink configuration
    ///
    /// Returns an error if the configuration is invalid or has no endpoint.
    pub fn new(config: &SinkConfig, client: &ClientInfo) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("endpoint is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        headers.insert(
            "X-Client-Name",
            HeaderValue::from_str(&client.client_name)
                .map_err(|e| Error::Config(format!("invalid client_name: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .user_agent(format!("walletpulse/{}", client.client_version))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// URL a record named `name` is posted to
    pub fn record_url(&self, name: &str) -> String {
        format!("{}/records/{}", self.base_url, urlencoding::encode(name))
    }

    /// Post a single record
    pub async fn send_record(&self, name: &str, record: &AnalyticsRecord) -> Result<()> {
        let response = self
            .http_client
            .post(self.record_url(name))
            .json(record)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        Err(Error::Transport(format!("API error ({}): {}", status, error_text)))
    }
}

/// Delivery counters
#[derive(Debug, Default)]
pub struct DeliveryStats {
    sent: AtomicUsize,
    failed: AtomicUsize,
}

/// Point-in-time copy of [`DeliveryStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliverySnapshot {
    /// Records accepted by the endpoint
    pub sent: usize,
    /// Records that failed (network error or non-2xx)
    pub failed: usize,
}

impl DeliveryStats {
    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

enum Delivery {
    Record {
        name: String,
        record: AnalyticsRecord,
    },
    Drain(oneshot::Sender<()>),
}

/// [`RecordSink`] that posts records over HTTP from a background task.
pub struct HttpSink {
    tx: mpsc::UnboundedSender<Delivery>,
    stats: Arc<DeliveryStats>,
}

impl HttpSink {
    /// Start the delivery task on the current tokio runtime.
    pub fn spawn(client: MetricsClient) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();
        let stats = Arc::new(DeliveryStats::default());
        let worker_stats = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                match delivery {
                    Delivery::Record { name, record } => {
                        match client.send_record(&name, &record).await {
                            Ok(()) => {
                                worker_stats.sent.fetch_add(1, Ordering::Relaxed);
                                tracing::debug!(name = %name, "Delivered record");
                            }
                            Err(e) => {
                                worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                                tracing::warn!(name = %name, error = %e, "Failed to deliver record");
                            }
                        }
                    }
                    Delivery::Drain(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx, stats }
    }

    /// Build a sink from configuration. Returns `None` if the sink is not ready.
    pub fn from_config(config: &SinkConfig, client: &ClientInfo) -> Result<Option<Self>> {
        if !config.is_ready() {
            return Ok(None);
        }
        Ok(Some(Self::spawn(MetricsClient::new(config, client)?)))
    }

    pub fn stats(&self) -> DeliverySnapshot {
        self.stats.snapshot()
    }

    /// Resolve once every record queued before this call has been attempted.
    pub async fn drain(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Delivery::Drain(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl RecordSink for HttpSink {
    fn send(&self, name: &str, record: AnalyticsRecord) {
        let delivery = Delivery::Record {
            name: name.to_string(),
            record,
        };
        if self.tx.send(delivery).is_err() {
            tracing::warn!(name, "Delivery task is gone, dropping record");
        }
    }
}
