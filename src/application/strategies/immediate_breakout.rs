//! Morning-range breakout (spec.md §4.8a). Captures the day's first
//! 5-minute bar as the morning range, then watches for a breakout of it
//! by a fixed buffer.

use super::{StrategyContext, StrategyEvaluator};
use crate::domain::candle::DirectionBias;
use crate::domain::signal::{AnalysisContext, Direction, Signal, SignalKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const BREAKOUT_BUFFER: Decimal = dec!(0.0007);

#[derive(Debug, Clone, Copy)]
struct MorningRange {
    high: Decimal,
    low: Decimal,
}

pub struct ImmediateBreakout {
    current_day: Option<NaiveDate>,
    morning_range: Option<MorningRange>,
    in_long: bool,
    in_short: bool,
}

impl Default for ImmediateBreakout {
    fn default() -> Self {
        Self {
            current_day: None,
            morning_range: None,
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

fn buffered(price: Decimal, buffer: Decimal, up: bool) -> Decimal {
    let factor = if up { Decimal::ONE + buffer } else { Decimal::ONE - buffer };
    (price * factor).round_dp(2)
}

impl StrategyEvaluator for ImmediateBreakout {
    fn reset_for_new_day(&mut self) {
        self.morning_range = None;
        self.in_long = false;
        self.in_short = false;
    }

    fn evaluate(&mut self, ctx: &StrategyContext) -> Option<Signal> {
        let day = day_of(ctx.candle.timestamp);
        if self.current_day != Some(day) {
            self.current_day = Some(day);
            self.reset_for_new_day();
        }

        let range = match self.morning_range {
            None => {
                self.morning_range = Some(MorningRange {
                    high: ctx.candle.high,
                    low: ctx.candle.low,
                });
                return None;
            }
            Some(range) => range,
        };

        let long_trigger = buffered(range.high, BREAKOUT_BUFFER, true);
        let short_trigger = buffered(range.low, BREAKOUT_BUFFER, false);
        let bias = ctx.direction_bias();

        if !self.in_long && bias != DirectionBias::Bearish && ctx.candle.high >= long_trigger {
            self.in_long = true;
            return Some(Signal {
                instrument_key: ctx.instrument.instrument_key.clone(),
                kind: SignalKind::ImmediateBreakout,
                direction: Direction::Long,
                timestamp: ctx.candle.timestamp,
                entry_price: long_trigger,
                stop_loss: range.low,
                context: AnalysisContext::default()
                    .with_note(format!("morning_range_high={}", range.high)),
            });
        }

        if !self.in_short && bias != DirectionBias::Bullish && ctx.candle.low <= short_trigger {
            self.in_short = true;
            return Some(Signal {
                instrument_key: ctx.instrument.instrument_key.clone(),
                kind: SignalKind::ImmediateBreakout,
                direction: Direction::Short,
                timestamp: ctx.candle.timestamp,
                entry_price: short_trigger,
                stop_loss: range.high,
                context: AnalysisContext::default()
                    .with_note(format!("morning_range_low={}", range.low)),
            });
        }

        None
    }
}
