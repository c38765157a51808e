//! Port contracts the core consumes from external collaborators (spec.md
//! §1, §4.5, §6): broker transport, persistent storage, audio playback.
//! The core depends only on these traits; infrastructure adapters
//! implement them.

use crate::domain::alert::AlertEvent;
use crate::domain::candle::{Candle, Instrument, Interval};
use crate::domain::errors::{AlertPlaybackError, BrokerError, GroupCapacityError, StoreConflict};
use crate::domain::group::StockGroup;
use crate::domain::indicators::IndicatorSet;
use crate::domain::order::{Order, OrderReceipt};
use crate::domain::process::Process;
use async_trait::async_trait;
use chrono::NaiveDateTime;

#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn fetch_latest_minute(
        &self,
        instrument_key: &str,
        as_of: NaiveDateTime,
    ) -> Result<Candle, BrokerError>;

    async fn place_order(&self, order: &Order) -> Result<OrderReceipt, BrokerError>;
}

#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Idempotent on (instrument_key, timestamp, interval).
    async fn upsert(&self, candle: Candle) -> Result<(), StoreConflict>;

    /// Ascending timestamp order, `[from, to)`.
    async fn range(
        &self,
        instrument_key: &str,
        interval: Interval,
        from: i64,
        to: i64,
    ) -> Vec<Candle>;

    /// Most recent `n` candles, ascending order.
    async fn tail(&self, instrument_key: &str, interval: Interval, n: usize) -> Vec<Candle>;
}

#[async_trait]
pub trait IndicatorStore: Send + Sync {
    async fn upsert(
        &self,
        instrument_key: &str,
        timestamp: i64,
        interval: Interval,
        indicators: IndicatorSet,
    ) -> Result<(), StoreConflict>;

    async fn get(
        &self,
        instrument_key: &str,
        timestamp: i64,
        interval: Interval,
    ) -> Option<IndicatorSet>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn active_groups_by_entry_type(
        &self,
        entry_type: crate::domain::group::EntryType,
    ) -> Vec<StockGroup>;

    async fn all(&self) -> Vec<StockGroup>;

    /// Rejects the upsert with `GroupCapacityError` if transitioning
    /// `group` into `Executing` would put more than the configured cap of
    /// groups into that status simultaneously (spec.md §3).
    async fn upsert(&self, group: StockGroup) -> Result<(), GroupCapacityError>;
}

#[async_trait]
pub trait ProcessStore: Send + Sync {
    async fn find_by_date(&self, process_date: chrono::NaiveDate) -> Option<Process>;
    async fn upsert_process(&self, process: Process);
    async fn upsert_step(&self, step: crate::domain::process::ProcessStep);
    async fn steps(&self, process_id: &str) -> Vec<crate::domain::process::ProcessStep>;
}

/// Read-only port over the offline-computed per-instrument volatility
/// baseline (spec.md §9 — "CSV as a database" resolved as a port).
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn lowest_bb_width(&self, instrument_key: &str) -> Option<f64>;
}

/// Resolves an `instrument_key` to its full identity, in particular the
/// broker `security_id` orders must carry (spec.md §3, §4.9).
#[async_trait]
pub trait InstrumentDirectory: Send + Sync {
    async fn resolve(&self, instrument_key: &str) -> Option<Instrument>;
}

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Attempts playback of this tier; `Ok(())` means this tier succeeded.
    async fn play(&self, alert: &AlertEvent) -> Result<(), AlertPlaybackError>;
}
