pub mod bb_width_squeeze;
pub mod immediate_breakout;
pub mod time_of_day_breakout;

use crate::domain::candle::{Candle, DirectionBias, Instrument};
use crate::domain::indicators::IndicatorSet;
use crate::domain::signal::Signal;

/// Everything an evaluator needs to judge one bar. Borrowed, not owned:
/// evaluators are pure functions of this plus their own daily-reset state.
pub struct StrategyContext<'a> {
    pub instrument: &'a Instrument,
    pub candle: &'a Candle,
    pub indicators: &'a IndicatorSet,
    /// Per-instrument volatility baseline from `BaselineStore`, resolved by
    /// the caller before evaluation so evaluators stay synchronous and pure.
    pub lowest_bb_width: Option<f64>,
}

impl StrategyContext<'_> {
    pub fn direction_bias(&self) -> DirectionBias {
        self.instrument.direction_bias
    }
}

/// A strategy plug-in (spec.md §4.8). Implementations hold per-instance
/// daily state (morning range, squeeze counters); that state is never
/// shared across groups or instruments.
pub trait StrategyEvaluator: Send + Sync {
    fn evaluate(&mut self, ctx: &StrategyContext) -> Option<Signal>;

    /// Resets per-day state. Called once at the first bar of a trading day.
    fn reset_for_new_day(&mut self);
}
