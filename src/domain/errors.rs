use chrono::NaiveDate;
use thiserror::Error;

/// Calendar lookup beyond known trading history.
#[derive(Debug, Error)]
pub enum CalendarRangeError {
    #[error("cannot step {steps} trading days back from {from}: insufficient known history")]
    InsufficientHistory { from: NaiveDate, steps: u32 },
}

/// NaN/Inf/negative inputs reaching the indicator engine.
#[derive(Debug, Error)]
pub enum IndicatorInputError {
    #[error("non-finite value at index {index}: {value}")]
    NonFinite { index: usize, value: f64 },

    #[error("negative volume at index {index}: {value}")]
    NegativeVolume { index: usize, value: f64 },
}

/// The aggregator was asked to fold a window that isn't exactly five
/// consecutive, minute-aligned 1-minute candles.
#[derive(Debug, Error)]
pub enum IncompleteWindowError {
    #[error("expected 5 one-minute candles for window starting {start}, found {found}")]
    MissingCandles { start: i64, found: usize },

    #[error("candle at offset {offset} has timestamp {actual}, expected {expected}")]
    NonConsecutive {
        offset: usize,
        expected: i64,
        actual: i64,
    },

    #[error("window start {start} does not align to a 5-minute boundary since market open")]
    Misaligned { start: i64 },
}

/// Concurrent upsert collision on a store's primary key.
#[derive(Debug, Error)]
pub enum StoreConflict {
    #[error("concurrent upsert collision for key {key}")]
    Collision { key: String },
}

/// Broker-side failure kinds, per spec.md §6/§7.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("transient broker error: {reason}")]
    Transient { reason: String },

    #[error("broker validation error: {reason}")]
    Validation { reason: String },

    #[error("broker authentication error: {reason}")]
    Authentication { reason: String },

    #[error("broker rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

impl BrokerError {
    /// True for failure kinds the caller should retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Transient { .. } | BrokerError::RateLimited { .. })
    }
}

/// A group upsert would have put more than `MAX_ACTIVE_GROUPS` groups into
/// `Executing` status at once (spec.md §3, §6 `groups.max_active`).
#[derive(Debug, Error)]
#[error("group {id} would exceed the active-group cap of {max_active} ({currently_active} already executing)")]
pub struct GroupCapacityError {
    pub id: String,
    pub max_active: usize,
    pub currently_active: usize,
}

/// A Signal reached the OrderRouter without a resolvable broker security_id.
#[derive(Debug, Error)]
#[error("signal for {instrument_key} has no resolvable security_id")]
pub struct OrderIdentityError {
    pub instrument_key: String,
}

/// Every tier of the audio playback chain failed.
#[derive(Debug, Error)]
#[error("all playback tiers failed for alert on {instrument_key}: {reason}")]
pub struct AlertPlaybackError {
    pub instrument_key: String,
    pub reason: String,
}
