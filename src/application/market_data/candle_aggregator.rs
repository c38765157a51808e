//! Folds exactly five consecutive 1-minute candles into one 5-minute
//! candle (spec.md §4.3). Pure: no store access, no suspension points.

use crate::domain::candle::{Candle, Interval};
use crate::domain::errors::IncompleteWindowError;
use rust_decimal::Decimal;

pub struct CandleAggregator;

impl CandleAggregator {
    /// `market_open_timestamp` is the 09:15 market-local timestamp for the
    /// constituents' trading day, used to validate 5-minute alignment.
    pub fn aggregate(
        one_minute_bars: &[Candle],
        market_open_timestamp: i64,
    ) -> Result<Candle, IncompleteWindowError> {
        if one_minute_bars.len() != 5 {
            return Err(IncompleteWindowError::MissingCandles {
                start: one_minute_bars.first().map(|c| c.timestamp).unwrap_or(0),
                found: one_minute_bars.len(),
            });
        }

        let start = one_minute_bars[0].timestamp;
        if (start - market_open_timestamp).rem_euclid(300) != 0 {
            return Err(IncompleteWindowError::Misaligned { start });
        }

        for (offset, bar) in one_minute_bars.iter().enumerate() {
            let expected = start + offset as i64 * 60;
            if bar.timestamp != expected {
                return Err(IncompleteWindowError::NonConsecutive {
                    offset,
                    expected,
                    actual: bar.timestamp,
                });
            }
        }

        let high = one_minute_bars.iter().map(|c| c.high).max().unwrap_or(Decimal::ZERO);
        let low = one_minute_bars.iter().map(|c| c.low).min().unwrap_or(Decimal::ZERO);
        let volume = one_minute_bars.iter().map(|c| c.volume).sum();

        Candle::new(
            one_minute_bars[0].instrument_key.clone(),
            start,
            Interval::FiveMin,
            one_minute_bars[0].open,
            high,
            low,
            one_minute_bars[4].close,
            volume,
        )
        .map_err(|_| IncompleteWindowError::Misaligned { start })
    }
}
