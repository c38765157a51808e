//! Wall-clock-aligned ingestion loop (spec.md §4.4). Drives per-minute
//! candle ingestion and, at true 5-minute boundaries, aggregation and
//! indicator recomputation.

use super::candle_aggregator::CandleAggregator;
use super::event_bus::{EventBus, FiveMinCloseEvent};
use crate::domain::calendar::TradingCalendar;
use crate::domain::candle::{Instrument, Interval};
use crate::domain::indicators::IndicatorEngine;
use crate::domain::ports::{BrokerClient, CandleStore, IndicatorStore};
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub minute_offset_seconds: u64,
    pub per_instrument_timeout_seconds: u64,
    pub worker_pool_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            minute_offset_seconds: 8,
            per_instrument_timeout_seconds: 5,
            worker_pool_size: num_cpus_fallback(),
        }
    }
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub struct TickScheduler {
    broker: Arc<dyn BrokerClient>,
    candle_store: Arc<dyn CandleStore>,
    indicator_store: Arc<dyn IndicatorStore>,
    calendar: Arc<TradingCalendar>,
    event_bus: Arc<EventBus>,
    instruments: Vec<Instrument>,
    config: SchedulerConfig,
    worker_permits: Arc<Semaphore>,
}

impl TickScheduler {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        candle_store: Arc<dyn CandleStore>,
        indicator_store: Arc<dyn IndicatorStore>,
        calendar: Arc<TradingCalendar>,
        event_bus: Arc<EventBus>,
        instruments: Vec<Instrument>,
        config: SchedulerConfig,
    ) -> Self {
        let worker_permits = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        Self {
            broker,
            candle_store,
            indicator_store,
            calendar,
            event_bus,
            instruments,
            config,
            worker_permits,
        }
    }

    /// Runs cycles until `cancel` is signalled. Finishes the in-flight
    /// cycle before exiting; never begins a new one after cancellation.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        loop {
            if *cancel.borrow() {
                return;
            }

            let intended_wake = next_wake(Utc::now().naive_utc(), self.config.minute_offset_seconds);
            let sleep_for = (intended_wake - Utc::now().naive_utc())
                .to_std()
                .unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        return;
                    }
                }
            }

            if *cancel.borrow() {
                return;
            }

            let actual_wake = Utc::now().naive_utc();
            let drift = (actual_wake - intended_wake).num_milliseconds().unsigned_abs();
            if drift > 500 {
                warn!(drift_ms = drift, "scheduler wake drift exceeded 500ms");
            }

            self.run_cycle(actual_wake).await;
        }
    }

    async fn run_cycle(&self, now: NaiveDateTime) {
        let today = now.date();
        if !self.calendar.is_trading_day(today) {
            return;
        }

        self.ingest_minute_candles(now).await;

        let market_open = self.calendar.market_open(today);
        let at_boundary = (now.and_utc().timestamp() - market_open.and_utc().timestamp()).rem_euclid(300) == 0
            && now >= market_open + ChronoDuration::minutes(5);
        if !at_boundary {
            return;
        }

        let window_start = now - ChronoDuration::minutes(5);
        self.aggregate_and_publish(window_start, now).await;
    }

    async fn ingest_minute_candles(&self, now: NaiveDateTime) {
        let mut tasks = tokio::task::JoinSet::new();
        for instrument in self.instruments.clone() {
            let permits = Arc::clone(&self.worker_permits);
            let broker = Arc::clone(&self.broker);
            let candle_store = Arc::clone(&self.candle_store);
            let timeout = Duration::from_secs(self.config.per_instrument_timeout_seconds);
            tasks.spawn(async move {
                let _permit = permits.acquire().await.expect("semaphore never closed");
                let fetch = broker.fetch_latest_minute(&instrument.instrument_key, now);
                match tokio::time::timeout(timeout, fetch).await {
                    Ok(Ok(candle)) => {
                        if let Err(err) = candle_store.upsert(candle).await {
                            warn!(instrument = %instrument.instrument_key, error = %err, "1-minute upsert conflict");
                        }
                    }
                    Ok(Err(err)) => {
                        warn!(instrument = %instrument.instrument_key, error = %err, "1-minute fetch failed");
                    }
                    Err(_) => {
                        warn!(instrument = %instrument.instrument_key, "1-minute fetch timed out");
                    }
                }
            });
        }
        while tasks.join_next().await.is_some() {}
    }

    async fn aggregate_and_publish(&self, window_start: NaiveDateTime, window_end: NaiveDateTime) {
        let start_ts = window_start.and_utc().timestamp();
        let end_ts = window_end.and_utc().timestamp();
        let market_open_ts = self.calendar.market_open(window_start.date()).and_utc().timestamp();

        for instrument in &self.instruments {
            let bars = self
                .candle_store
                .range(&instrument.instrument_key, Interval::OneMin, start_ts, end_ts)
                .await;

            let five_min = match CandleAggregator::aggregate(&bars, market_open_ts) {
                Ok(candle) => candle,
                Err(err) => {
                    info!(instrument = %instrument.instrument_key, error = %err, "5-minute aggregation skipped");
                    continue;
                }
            };

            if let Err(err) = self.candle_store.upsert(five_min.clone()).await {
                warn!(instrument = %instrument.instrument_key, error = %err, "5-minute upsert conflict");
                continue;
            }

            // Extend the lookback across trading days so Bollinger Bands'
            // 20-period warm-up is satisfied on the first bar of a session.
            let mut extension = self
                .candle_store
                .tail(&instrument.instrument_key, Interval::FiveMin, 19)
                .await;
            extension.retain(|c| c.timestamp < five_min.timestamp);
            extension.push(five_min.clone());

            match IndicatorEngine::compute(&extension) {
                Ok(sets) => {
                    if let Some(latest) = sets.last() {
                        let _ = self
                            .indicator_store
                            .upsert(&instrument.instrument_key, five_min.timestamp, Interval::FiveMin, *latest)
                            .await;
                    }
                }
                Err(err) => {
                    warn!(instrument = %instrument.instrument_key, error = %err, "indicator computation failed");
                }
            }
        }

        self.event_bus
            .fire(FiveMinCloseEvent { start: start_ts, end: end_ts })
            .await;
    }
}

/// The next wall-clock instant at `minute_offset_seconds` past a minute
/// boundary, strictly after `now`.
fn next_wake(now: NaiveDateTime, minute_offset_seconds: u64) -> NaiveDateTime {
    use chrono::Timelike;
    let minute_start = NaiveDateTime::new(
        now.date(),
        chrono::NaiveTime::from_hms_opt(now.time().hour(), now.time().minute(), 0)
            .expect("hour/minute taken from a valid time are always valid"),
    );
    let candidate = minute_start + ChronoDuration::seconds(minute_offset_seconds as i64);
    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::minutes(1)
    }
}
