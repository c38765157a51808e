//! Prometheus metrics definitions for the trading core.
//!
//! All metrics use the `intraday_` prefix and are read-only from the
//! core's point of view; nothing here accepts incoming connections.

use prometheus::{
    CounterVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Scheduler cycles run, total.
    pub ticks_run_total: GenericGauge<AtomicF64>,
    /// 5-minute bars published, by instrument.
    pub five_min_bars_published_total: CounterVec,
    /// Alerts emitted vs. suppressed, by reason.
    pub alerts_total: CounterVec,
    /// Orders placed vs. failed, by outcome.
    pub orders_total: CounterVec,
    /// Scheduler wake-time drift, seconds.
    pub scheduler_drift_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ticks_run_total = GenericGauge::with_opts(Opts::new(
            "intraday_ticks_run_total",
            "Scheduler cycles run since process start",
        ))?;
        registry.register(Box::new(ticks_run_total.clone()))?;

        let five_min_bars_published_total = CounterVec::new(
            Opts::new("intraday_five_min_bars_published_total", "5-minute bars published"),
            &["instrument_key"],
        )?;
        registry.register(Box::new(five_min_bars_published_total.clone()))?;

        let alerts_total = CounterVec::new(
            Opts::new("intraday_alerts_total", "Alert events by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(alerts_total.clone()))?;

        let orders_total = CounterVec::new(
            Opts::new("intraday_orders_total", "Orders routed by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let scheduler_drift_seconds = Histogram::with_opts(HistogramOpts::new(
            "intraday_scheduler_drift_seconds",
            "Scheduler wake-time drift",
        ))?;
        registry.register(Box::new(scheduler_drift_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            ticks_run_total,
            five_min_bars_published_total,
            alerts_total,
            orders_total,
            scheduler_drift_seconds,
        })
    }

    pub fn encode_text(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        Ok(encoder.encode_to_string(&families)?)
    }
}
