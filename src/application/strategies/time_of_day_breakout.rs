//! Breakout of a range captured at a configured time of day (spec.md
//! §4.8b). Same breakout mechanics as `ImmediateBreakout`, a tighter
//! buffer, and a capture bar pinned to a wall-clock time instead of the
//! session's first bar.

use super::{StrategyContext, StrategyEvaluator};
use crate::domain::candle::DirectionBias;
use crate::domain::signal::{AnalysisContext, Direction, Signal, SignalKind};
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const BREAKOUT_BUFFER: Decimal = dec!(0.0003);

#[derive(Debug, Clone, Copy)]
struct CapturedRange {
    high: Decimal,
    low: Decimal,
}

pub struct TimeOfDayBreakout {
    /// Close time of the capture bar: `entry_time_of_day + 5min`.
    capture_close_time: NaiveTime,
    current_day: Option<NaiveDate>,
    range: Option<CapturedRange>,
    in_long: bool,
    in_short: bool,
}

impl TimeOfDayBreakout {
    pub fn new(entry_time_of_day: NaiveTime) -> Self {
        Self {
            capture_close_time: entry_time_of_day + chrono::Duration::minutes(5),
            current_day: None,
            range: None,
            in_long: false,
            in_short: false,
        }
    }
}

fn day_of(timestamp: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

fn close_time_of(timestamp: i64) -> NaiveTime {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| {
            let t = dt.time();
            NaiveTime::from_hms_opt(t.hour(), t.minute(), t.second())
                .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
        })
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
        + chrono::Duration::minutes(5)
}

fn buffered(price: Decimal, buffer: Decimal, up: bool) -> Decimal {
    let factor = if up { Decimal::ONE + buffer } else { Decimal::ONE - buffer };
    (price * factor).round_dp(2)
}

impl StrategyEvaluator for TimeOfDayBreakout {
    fn reset_for_new_day(&mut self) {
        self.range = None;
        self.in_long = false;
        self.in_short = false;
    }

    fn evaluate(&mut self, ctx: &StrategyContext) -> Option<Signal> {
        let day = day_of(ctx.candle.timestamp);
        if self.current_day != Some(day) {
            self.current_day = Some(day);
            self.reset_for_new_day();
        }

        let bar_close_time = close_time_of(ctx.candle.timestamp);

        if self.range.is_none() {
            if bar_close_time != self.capture_close_time {
                return None;
            }
            self.range = Some(CapturedRange {
                high: ctx.candle.high,
                low: ctx.candle.low,
            });
            return None;
        }

        let range = self.range.expect("checked above");
        let long_trigger = buffered(range.high, BREAKOUT_BUFFER, true);
        let short_trigger = buffered(range.low, BREAKOUT_BUFFER, false);
        let bias = ctx.direction_bias();

        if !self.in_long && bias != DirectionBias::Bearish && ctx.candle.high >= long_trigger {
            self.in_long = true;
            return Some(Signal {
                instrument_key: ctx.instrument.instrument_key.clone(),
                kind: SignalKind::TimeOfDayBreakout,
                direction: Direction::Long,
                timestamp: ctx.candle.timestamp,
                entry_price: long_trigger,
                stop_loss: range.low,
                context: AnalysisContext::default()
                    .with_note(format!("range_high={}", range.high)),
            });
        }

        if !self.in_short && bias != DirectionBias::Bullish && ctx.candle.low <= short_trigger {
            self.in_short = true;
            return Some(Signal {
                instrument_key: ctx.instrument.instrument_key.clone(),
                kind: SignalKind::TimeOfDayBreakout,
                direction: Direction::Short,
                timestamp: ctx.candle.timestamp,
                entry_price: short_trigger,
                stop_loss: range.high,
                context: AnalysisContext::default()
                    .with_note(format!("range_low={}", range.low)),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::{Candle, Instrument, Interval};
    use crate::domain::indicators::IndicatorSet;
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument {
            instrument_key: "NSE:X".into(),
            symbol: "X".into(),
            security_id: "1".into(),
            exchange: "NSE".into(),
            direction_bias: DirectionBias::None,
        }
    }

    fn candle(ts: i64, h: Decimal, l: Decimal) -> Candle {
        Candle::new("NSE:X", ts, Interval::FiveMin, l, h, l, h, dec!(1000)).unwrap()
    }

    #[test]
    fn ignores_bars_before_the_capture_time_then_captures_and_breaks_out() {
        let mut strategy = TimeOfDayBreakout::new(NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        let instrument = instrument();
        let indicators = IndicatorSet::default();

        // 2024-01-01 14:25 start -> 14:30 close (before capture close time 14:35)
        let early = candle(1_704_119_100, dec!(150), dec!(149));
        let ctx = StrategyContext { instrument: &instrument, candle: &early, indicators: &indicators, lowest_bb_width: None };
        assert!(strategy.evaluate(&ctx).is_none());
        assert!(strategy.range.is_none());

        // 14:30 start -> 14:35 close: capture bar
        let capture = candle(1_704_119_400, dec!(160), dec!(155));
        let ctx = StrategyContext { instrument: &instrument, candle: &capture, indicators: &indicators, lowest_bb_width: None };
        assert!(strategy.evaluate(&ctx).is_none());

        let breakout = candle(1_704_119_700, dec!(161), dec!(156));
        let ctx = StrategyContext { instrument: &instrument, candle: &breakout, indicators: &indicators, lowest_bb_width: None };
        let signal = strategy.evaluate(&ctx).unwrap();
        assert_eq!(signal.direction, Direction::Long);
    }
}
