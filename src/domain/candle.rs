use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar interval. `timestamp` on a `Candle` is the start of the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    OneMin,
    FiveMin,
    Day,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::OneMin => write!(f, "1min"),
            Interval::FiveMin => write!(f, "5min"),
            Interval::Day => write!(f, "day"),
        }
    }
}

/// Upstream trend tag on an instrument, set by the universe scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionBias {
    Bullish,
    Bearish,
    None,
}

/// Immutable identity of a tradable symbol (spec.md §3).
///
/// `security_id` is the broker-specific identifier orders must carry;
/// `instrument_key` is the stable opaque identity used across every port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_key: String,
    pub symbol: String,
    pub security_id: String,
    pub exchange: String,
    pub direction_bias: DirectionBias,
}

/// One OHLCV bar. Invariants (enforced by `Candle::new`):
/// `low <= min(open, close) <= max(open, close) <= high`, `volume >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub instrument_key: String,
    /// Start of the bar, seconds since epoch, market-local wall clock.
    pub timestamp: i64,
    pub interval: Interval,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum CandleInvariantError {
    #[error("low {low} exceeds min(open, close) {min_oc}")]
    LowAboveBody { low: Decimal, min_oc: Decimal },
    #[error("high {high} is below max(open, close) {max_oc}")]
    HighBelowBody { high: Decimal, max_oc: Decimal },
    #[error("negative volume: {volume}")]
    NegativeVolume { volume: Decimal },
}

impl Candle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument_key: impl Into<String>,
        timestamp: i64,
        interval: Interval,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, CandleInvariantError> {
        let min_oc = open.min(close);
        let max_oc = open.max(close);
        if low > min_oc {
            return Err(CandleInvariantError::LowAboveBody { low, min_oc });
        }
        if high < max_oc {
            return Err(CandleInvariantError::HighBelowBody { high, max_oc });
        }
        if volume < Decimal::ZERO {
            return Err(CandleInvariantError::NegativeVolume { volume });
        }
        Ok(Self {
            instrument_key: instrument_key.into(),
            timestamp,
            interval,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }
}

/// The minute-of-day a 5-minute bar that starts at `(minute - 15) mod 5 == 0`
/// within market hours closes at, i.e. `minute + 5`. Used by callers that
/// need to format a close time as "HH:MM" for trigger matching (spec.md §4.7).
pub fn minute_of_day(timestamp: i64) -> i64 {
    let seconds_since_midnight = timestamp.rem_euclid(86_400);
    seconds_since_midnight / 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_low_above_body() {
        let err = Candle::new(
            "NSE:RELIANCE",
            0,
            Interval::OneMin,
            dec!(100),
            dec!(102),
            dec!(101),
            dec!(101),
            dec!(10),
        )
        .unwrap_err();
        assert!(matches!(err, CandleInvariantError::LowAboveBody { .. }));
    }

    #[test]
    fn rejects_negative_volume() {
        let err = Candle::new(
            "NSE:RELIANCE",
            0,
            Interval::OneMin,
            dec!(100),
            dec!(102),
            dec!(99),
            dec!(101),
            dec!(-1),
        )
        .unwrap_err();
        assert!(matches!(err, CandleInvariantError::NegativeVolume { .. }));
    }

    #[test]
    fn accepts_a_valid_candle() {
        let c = Candle::new(
            "NSE:RELIANCE",
            0,
            Interval::OneMin,
            dec!(100),
            dec!(102),
            dec!(99),
            dec!(101),
            dec!(1000),
        )
        .unwrap();
        assert_eq!(c.typical_price(), (dec!(102) + dec!(99) + dec!(101)) / dec!(3));
    }
}
