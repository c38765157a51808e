//! Push-based metrics reporter. Periodically outputs a JSON snapshot of
//! the alert service's recent history and process uptime to stdout.
//!
//! **Note**: this system only sends data, never accepts requests.

use crate::application::alert_service::AlertService;
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Serialize)]
struct MetricsSnapshot {
    uptime_seconds: u64,
    version: String,
    recent_alerts: usize,
}

pub struct MetricsReporter {
    alert_service: Arc<AlertService>,
    #[allow(dead_code)]
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(alert_service: Arc<AlertService>, metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            alert_service,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Runs until the process exits. Never returns early on a single
    /// failed snapshot; logs and continues on the next tick.
    pub async fn run(self) {
        info!(interval = ?self.interval, "metrics reporter starting");
        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = MetricsSnapshot {
                uptime_seconds: self.start_time.elapsed().as_secs(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                recent_alerts: self.alert_service.history().await.len(),
            };

            match serde_json::to_string(&snapshot) {
                Ok(json) => println!("METRICS_JSON:{json}"),
                Err(err) => tracing::warn!(error = %err, "failed to serialize metrics snapshot"),
            }
        }
    }
}
