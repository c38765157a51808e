//! Converts 5-minute close events into per-entry-type strategy triggers
//! and, unconditionally, BB-width monitoring for BB_RANGE groups
//! (spec.md §4.7).

use crate::application::bb_width_monitor::BbWidthMonitor;
use crate::application::market_data::event_bus::{FiveMinCloseEvent, FiveMinCloseListener};
use crate::application::order_router::OrderRouter;
use crate::application::strategies::bb_width_squeeze::BbWidthSqueeze;
use crate::application::strategies::immediate_breakout::ImmediateBreakout;
use crate::application::strategies::time_of_day_breakout::TimeOfDayBreakout;
use crate::application::strategies::{StrategyContext, StrategyEvaluator};
use crate::domain::candle::Interval;
use crate::domain::group::{EntryType, StockGroup};
use crate::domain::ports::{BaselineStore, CandleStore, GroupStore, IndicatorStore, InstrumentDirectory};
use async_trait::async_trait;
use chrono::NaiveTime;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Wall-clock time-of-day a close timestamp falls on, truncated to the
/// minute (the granularity `trigger_hhmm` is configured at).
fn time_of_day(timestamp: i64) -> NaiveTime {
    let seconds_since_midnight = timestamp.rem_euclid(86_400) as u32;
    NaiveTime::from_hms_opt(seconds_since_midnight / 3600, (seconds_since_midnight % 3600) / 60, 0)
        .expect("a value taken modulo a day is always a valid time")
}

type EvaluatorKey = (String, String);

struct Inner {
    trigger_hhmm: HashMap<EntryType, NaiveTime>,
    group_store: Arc<dyn GroupStore>,
    candle_store: Arc<dyn CandleStore>,
    indicator_store: Arc<dyn IndicatorStore>,
    baseline_store: Arc<dyn BaselineStore>,
    instrument_directory: Arc<dyn InstrumentDirectory>,
    order_router: Arc<OrderRouter>,
    bb_width_monitor: Arc<BbWidthMonitor>,
    evaluators: Mutex<HashMap<EvaluatorKey, Box<dyn StrategyEvaluator>>>,
    /// Guards against a redelivered event double-executing the same
    /// (group, candle_close_time) pair.
    executed: Mutex<HashSet<(String, i64)>>,
}

/// Cheaply cloneable handle; the event bus holds one per listener and
/// spawned per-group tasks hold their own clone for the task's lifetime.
#[derive(Clone)]
pub struct GroupExecutionScheduler(Arc<Inner>);

impl GroupExecutionScheduler {
    pub fn new(
        trigger_hhmm: HashMap<EntryType, NaiveTime>,
        group_store: Arc<dyn GroupStore>,
        candle_store: Arc<dyn CandleStore>,
        indicator_store: Arc<dyn IndicatorStore>,
        baseline_store: Arc<dyn BaselineStore>,
        instrument_directory: Arc<dyn InstrumentDirectory>,
        order_router: Arc<OrderRouter>,
        bb_width_monitor: Arc<BbWidthMonitor>,
    ) -> Self {
        Self(Arc::new(Inner {
            trigger_hhmm,
            group_store,
            candle_store,
            indicator_store,
            baseline_store,
            instrument_directory,
            order_router,
            bb_width_monitor,
            evaluators: Mutex::new(HashMap::new()),
            executed: Mutex::new(HashSet::new()),
        }))
    }

    fn new_evaluator(&self, entry_type: EntryType) -> Box<dyn StrategyEvaluator> {
        match entry_type {
            EntryType::ImmediateBreakout => Box::new(ImmediateBreakout::default()),
            EntryType::TimeOfDayBreakout => {
                let trigger = self
                    .0
                    .trigger_hhmm
                    .get(&entry_type)
                    .copied()
                    .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 15, 0).unwrap());
                // trigger_hhmm stores the close_time; the capture bar *starts*
                // 5 minutes earlier.
                Box::new(TimeOfDayBreakout::new(trigger - chrono::Duration::minutes(5)))
            }
            EntryType::BbRange => Box::new(BbWidthSqueeze::default()),
        }
    }

    /// Serialised per group: instruments within a group are evaluated one
    /// at a time, preserving the order they appear in the group.
    async fn evaluate_group(self, group: StockGroup, close_time: i64) {
        let key = (group.id.clone(), close_time);
        {
            let mut executed = self.0.executed.lock().await;
            if !executed.insert(key) {
                return;
            }
        }

        let window_start = close_time - 300;
        for instrument_key in &group.instrument_keys {
            let candles = self
                .0
                .candle_store
                .range(instrument_key, Interval::FiveMin, window_start, close_time + 1)
                .await;
            let Some(candle) = candles.into_iter().find(|c| c.timestamp == window_start) else {
                continue;
            };
            let Some(indicators) = self
                .0
                .indicator_store
                .get(instrument_key, window_start, Interval::FiveMin)
                .await
            else {
                continue;
            };
            let lowest_bb_width = self.0.baseline_store.lowest_bb_width(instrument_key).await;
            let Some(instrument) = self.0.instrument_directory.resolve(instrument_key).await else {
                warn!(instrument = %instrument_key, "no instrument identity; skipping evaluation");
                continue;
            };

            let signal = {
                let mut evaluators = self.0.evaluators.lock().await;
                let evaluator = evaluators
                    .entry((group.id.clone(), instrument_key.clone()))
                    .or_insert_with(|| self.new_evaluator(group.entry_type));
                let ctx = StrategyContext {
                    instrument: &instrument,
                    candle: &candle,
                    indicators: &indicators,
                    lowest_bb_width,
                };
                evaluator.evaluate(&ctx)
            };

            if let Some(signal) = signal {
                if let Err(err) = self.0.order_router.route(&group.id, signal).await {
                    warn!(group = %group.id, error = %err, "order routing failed");
                }
            }
        }
    }
}

#[async_trait]
impl FiveMinCloseListener for GroupExecutionScheduler {
    async fn on_five_min_close(&self, event: FiveMinCloseEvent) {
        // BB_RANGE groups are monitored on every close event, independent
        // of the trigger map (spec.md §4.7), and also run their
        // StrategyEvaluator every close: the squeeze is a continuous
        // pattern over bars, not a single fixed-time trigger.
        let bb_groups = self.0.group_store.active_groups_by_entry_type(EntryType::BbRange).await;
        let mut monitor_tasks = JoinSet::new();
        for group in &bb_groups {
            let monitor = Arc::clone(&self.0.bb_width_monitor);
            let group = group.clone();
            monitor_tasks.spawn(async move { monitor.check_group(&group, event.end).await });
        }
        while monitor_tasks.join_next().await.is_some() {}

        // `trigger_hhmm` marks the close_time of the earliest bar
        // ImmediateBreakout/TimeOfDayBreakout should see; every later
        // close in the same trading day is dispatched too, so they keep
        // watching for a breakout after their capture bar (spec.md
        // §4.7, §4.8a/b, Scenario 2).
        let close_time_of_day = time_of_day(event.end);
        let triggered_entry_types: Vec<EntryType> = self
            .0
            .trigger_hhmm
            .iter()
            .filter(|(_, trigger)| close_time_of_day >= **trigger)
            .map(|(entry_type, _)| *entry_type)
            .collect();

        let mut group_tasks = JoinSet::new();
        for group in bb_groups {
            info!(group = %group.id, close_time = event.end, "dispatching bb_range strategy evaluation");
            let handle = self.clone();
            group_tasks.spawn(handle.evaluate_group(group, event.end));
        }
        for entry_type in triggered_entry_types {
            let groups = self.0.group_store.active_groups_by_entry_type(entry_type).await;
            for group in groups {
                info!(group = %group.id, close_time = event.end, "dispatching strategy evaluation");
                let handle = self.clone();
                group_tasks.spawn(handle.evaluate_group(group, event.end));
            }
        }
        while let Some(result) = group_tasks.join_next().await {
            if let Err(err) = result {
                warn!(error = %err, "group evaluation task panicked");
            }
        }
    }
}
