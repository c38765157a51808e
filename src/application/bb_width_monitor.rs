//! Pattern detector over persisted 5-minute bars: emits alert events when
//! contracting volatility enters a per-instrument optimal range
//! (spec.md §4.10).

use crate::application::alert_service::AlertService;
use crate::domain::alert::{AlertEvent, AlertType};
use crate::domain::candle::Interval;
use crate::domain::group::StockGroup;
use crate::domain::ports::{BaselineStore, CandleStore, IndicatorStore};
use std::sync::Arc;
use tracing::debug;

const LOOKBACK_CANDLES: usize = 5;
const MIN_CONTRACTING: usize = 3;
const OPTIMAL_RANGE_MARGIN: f64 = 0.001;

pub struct BbWidthMonitor {
    candle_store: Arc<dyn CandleStore>,
    indicator_store: Arc<dyn IndicatorStore>,
    baseline_store: Arc<dyn BaselineStore>,
    alert_service: Arc<AlertService>,
}

impl BbWidthMonitor {
    pub fn new(
        candle_store: Arc<dyn CandleStore>,
        indicator_store: Arc<dyn IndicatorStore>,
        baseline_store: Arc<dyn BaselineStore>,
        alert_service: Arc<AlertService>,
    ) -> Self {
        Self {
            candle_store,
            indicator_store,
            baseline_store,
            alert_service,
        }
    }

    pub async fn check_group(&self, group: &StockGroup, close_time: i64) {
        for instrument_key in &group.instrument_keys {
            self.check_instrument(instrument_key, close_time).await;
        }
    }

    async fn check_instrument(&self, instrument_key: &str, close_time: i64) {
        let bars = self
            .candle_store
            .tail(instrument_key, Interval::FiveMin, LOOKBACK_CANDLES)
            .await;
        if bars.len() < MIN_CONTRACTING {
            return;
        }
        // The most recent bar must be the one that just closed; otherwise
        // this instrument's store is behind the event that triggered us.
        if bars.last().map(|b| b.timestamp) != Some(close_time - 300) {
            return;
        }

        let mut widths = Vec::with_capacity(bars.len());
        for bar in &bars {
            let Some(indicators) = self
                .indicator_store
                .get(instrument_key, bar.timestamp, Interval::FiveMin)
                .await
            else {
                return;
            };
            let Some(width) = indicators.bb_width else {
                return;
            };
            // A zero-width bar anywhere in the sequence is circuit-bound /
            // illiquid: skip entirely (spec.md §4.2, §4.10).
            if width == 0.0 {
                return;
            }
            widths.push(width);
        }

        let strictly_contracting = widths.windows(2).all(|pair| pair[1] < pair[0]);
        if !strictly_contracting {
            debug!(instrument = %instrument_key, "bb_width sequence not strictly contracting");
            return;
        }

        let Some(lowest) = self.baseline_store.lowest_bb_width(instrument_key).await else {
            return;
        };
        if lowest <= 0.0 {
            return;
        }

        let lower_bound = lowest * (1.0 - OPTIMAL_RANGE_MARGIN);
        let upper_bound = lowest * (1.0 + OPTIMAL_RANGE_MARGIN);
        let current = *widths.last().expect("checked len above");

        if current < lower_bound || current > upper_bound {
            return;
        }

        let event = AlertEvent {
            symbol: instrument_key.to_string(),
            instrument_key: instrument_key.to_string(),
            alert_type: AlertType::BbWidthSqueeze,
            bb_width: current,
            lowest_bb_width: lowest,
            pattern_length: widths.len(),
            timestamp: close_time,
            message: format!(
                "{instrument_key}: bb_width {current:.6} entered optimal range around baseline {lowest:.6} over {} contracting bars",
                widths.len()
            ),
        };

        self.alert_service.emit(event).await;
    }
}
