//! Exercises `GroupExecutionScheduler` end to end through its public
//! `FiveMinCloseListener` surface, against the in-memory adapters, with
//! no wall-clock dependency (events are fired directly).

use async_trait::async_trait;
use chrono::NaiveTime;
use intraday_core::application::alert_service::{AlertService, AlertServiceConfig};
use intraday_core::application::bb_width_monitor::BbWidthMonitor;
use intraday_core::application::group_scheduler::GroupExecutionScheduler;
use intraday_core::application::market_data::event_bus::{FiveMinCloseEvent, FiveMinCloseListener};
use intraday_core::application::order_router::{OrderRouter, OrderRouterConfig};
use intraday_core::domain::candle::{Candle, DirectionBias, Instrument, Interval};
use intraday_core::domain::errors::BrokerError;
use intraday_core::domain::group::{EntryType, GroupStatus, StockGroup};
use intraday_core::domain::indicators::IndicatorSet;
use intraday_core::domain::order::{Order, OrderReceipt};
use intraday_core::domain::ports::{BrokerClient, CandleStore, GroupStore, IndicatorStore};
use intraday_core::infrastructure::memory::{
    InMemoryBaselineStore, InMemoryCandleStore, InMemoryGroupStore, InMemoryIndicatorStore, InMemoryInstrumentDirectory,
};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const OPEN: i64 = 1_704_085_800; // 2024-01-01 09:15:00 market-local

/// Records every order it's asked to place; always fills.
struct SpyBroker {
    orders_placed: AtomicUsize,
}

#[async_trait]
impl BrokerClient for SpyBroker {
    async fn fetch_latest_minute(&self, _instrument_key: &str, _as_of: chrono::NaiveDateTime) -> Result<Candle, BrokerError> {
        unimplemented!("not exercised by this test")
    }

    async fn place_order(&self, order: &Order) -> Result<OrderReceipt, BrokerError> {
        self.orders_placed.fetch_add(1, Ordering::SeqCst);
        Ok(OrderReceipt {
            broker_order_id: "spy-1".into(),
            idempotency_key: order.idempotency_key.clone(),
            filled_price: Some(order.price),
        })
    }
}

fn instrument(instrument_key: &str, bias: DirectionBias) -> Instrument {
    Instrument {
        instrument_key: instrument_key.into(),
        symbol: "X".into(),
        security_id: "100245".into(),
        exchange: "NSE".into(),
        direction_bias: bias,
    }
}

/// A `BBWidthSqueeze` group is never a key in the entry-trigger map, so this
/// confirms its Signal-emission path (not just the alert path) still runs on
/// every close.
#[tokio::test]
async fn bb_range_group_routes_an_order_with_no_trigger_time_configured() {
    let instrument_key = "NSE:SQZ";
    let candle_store: Arc<dyn CandleStore> = Arc::new(InMemoryCandleStore::default());
    let indicator_store: Arc<dyn IndicatorStore> = Arc::new(InMemoryIndicatorStore::default());
    let baseline_store = Arc::new(InMemoryBaselineStore::from_map(HashMap::from([(instrument_key.to_string(), 0.0092)])));
    let instrument_directory = Arc::new(InMemoryInstrumentDirectory::from_map(HashMap::from([(
        instrument_key.to_string(),
        instrument(instrument_key, DirectionBias::Bullish),
    )])));
    let group_store: Arc<dyn GroupStore> = Arc::new(InMemoryGroupStore::default());
    group_store
        .upsert(StockGroup {
            id: "g-squeeze".into(),
            name: "squeeze".into(),
            entry_type: EntryType::BbRange,
            status: GroupStatus::Executing,
            instrument_keys: vec![instrument_key.into()],
        })
        .await
        .unwrap();

    let alert_service = Arc::new(AlertService::new(AlertServiceConfig::default(), Vec::new()));
    let bb_width_monitor = Arc::new(BbWidthMonitor::new(
        candle_store.clone(),
        indicator_store.clone(),
        baseline_store.clone(),
        alert_service,
    ));
    let broker = Arc::new(SpyBroker { orders_placed: AtomicUsize::new(0) });
    let order_router = Arc::new(OrderRouter::new(broker.clone(), instrument_directory.clone(), OrderRouterConfig::default()));

    // Entry types other than BbRange have configured trigger times so the
    // scheduler has at least one entry in its map; BbRange deliberately has
    // none, which is the scenario this test targets.
    let trigger_hhmm = HashMap::from([(EntryType::ImmediateBreakout, NaiveTime::from_hms_opt(9, 20, 0).unwrap())]);

    let scheduler = GroupExecutionScheduler::new(
        trigger_hhmm,
        group_store,
        candle_store.clone(),
        indicator_store.clone(),
        baseline_store,
        instrument_directory,
        order_router,
        bb_width_monitor,
    );

    // Scenario 3's literal widths (spec.md §4.8c): a strictly decreasing
    // run whose squeeze_count reaches 5 by the final bar, which crosses
    // bb_upper with its high (BbWidthSqueeze requires squeeze_count >= 3
    // and the final bar's width at or below the baseline threshold).
    let widths = [0.0200_f64, 0.0150, 0.0110, 0.0095, 0.0091];
    for (i, width) in widths.iter().enumerate() {
        let ts = OPEN + i as i64 * 300;
        let high = if i == widths.len() - 1 { dec!(101.20) } else { dec!(100.0) };
        let candle = Candle::new(instrument_key, ts, Interval::FiveMin, dec!(100), high, dec!(98), dec!(100), dec!(1000)).unwrap();
        candle_store.upsert(candle).await.unwrap();
        indicator_store
            .upsert(
                instrument_key,
                ts,
                Interval::FiveMin,
                IndicatorSet {
                    bb_upper: Some(101.0),
                    bb_middle: Some(100.0),
                    bb_lower: Some(99.0),
                    bb_width: Some(*width),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // The scheduler reads the candle 5 minutes before the close it's
        // notified of.
        scheduler.on_five_min_close(FiveMinCloseEvent { start: ts, end: ts + 300 }).await;
    }

    // A long entry plus its stop-loss: two orders, with no trigger_hhmm
    // entry for BbRange anywhere in the map.
    assert_eq!(broker.orders_placed.load(Ordering::SeqCst), 2);
}

/// `trigger_hhmm` marks the earliest close each entry type should see;
/// ImmediateBreakout must keep watching every later close in the same
/// trading day, not just the single configured instant.
#[tokio::test]
async fn immediate_breakout_keeps_dispatching_after_its_trigger_time() {
    let instrument_key = "NSE:IMB";
    let candle_store: Arc<dyn CandleStore> = Arc::new(InMemoryCandleStore::default());
    let indicator_store: Arc<dyn IndicatorStore> = Arc::new(InMemoryIndicatorStore::default());
    let baseline_store = Arc::new(InMemoryBaselineStore::from_map(HashMap::new()));
    let instrument_directory = Arc::new(InMemoryInstrumentDirectory::from_map(HashMap::from([(
        instrument_key.to_string(),
        instrument(instrument_key, DirectionBias::None),
    )])));
    let group_store: Arc<dyn GroupStore> = Arc::new(InMemoryGroupStore::default());
    group_store
        .upsert(StockGroup {
            id: "g-breakout".into(),
            name: "breakout".into(),
            entry_type: EntryType::ImmediateBreakout,
            status: GroupStatus::Executing,
            instrument_keys: vec![instrument_key.into()],
        })
        .await
        .unwrap();

    let alert_service = Arc::new(AlertService::new(AlertServiceConfig::default(), Vec::new()));
    let bb_width_monitor = Arc::new(BbWidthMonitor::new(
        candle_store.clone(),
        indicator_store.clone(),
        baseline_store.clone(),
        alert_service,
    ));
    let broker = Arc::new(SpyBroker { orders_placed: AtomicUsize::new(0) });
    let order_router = Arc::new(OrderRouter::new(broker.clone(), instrument_directory.clone(), OrderRouterConfig::default()));

    // Trigger is 09:20; the capture bar and the breakout bar both close
    // after that, two 5-minute bars apart.
    let trigger_hhmm = HashMap::from([(EntryType::ImmediateBreakout, NaiveTime::from_hms_opt(9, 20, 0).unwrap())]);

    let scheduler = GroupExecutionScheduler::new(
        trigger_hhmm,
        group_store,
        candle_store.clone(),
        indicator_store.clone(),
        baseline_store,
        instrument_directory,
        order_router,
        bb_width_monitor,
    );

    // Capture bar: 09:15-09:20, closes exactly at the trigger.
    let capture_start = OPEN;
    let capture = Candle::new(instrument_key, capture_start, Interval::FiveMin, dec!(200), dec!(200), dec!(195), dec!(198), dec!(1000)).unwrap();
    candle_store.upsert(capture).await.unwrap();
    indicator_store.upsert(instrument_key, capture_start, Interval::FiveMin, IndicatorSet::default()).await.unwrap();
    scheduler
        .on_five_min_close(FiveMinCloseEvent { start: capture_start, end: capture_start + 300 })
        .await;

    // Breakout bar: 09:25-09:30, a close *after* the trigger time, not at it.
    let breakout_start = capture_start + 300;
    let breakout = Candle::new(
        instrument_key,
        breakout_start,
        Interval::FiveMin,
        dec!(200.5),
        dec!(200.60),
        dec!(199.0),
        dec!(200.5),
        dec!(1000),
    )
    .unwrap();
    candle_store.upsert(breakout).await.unwrap();
    indicator_store.upsert(instrument_key, breakout_start, Interval::FiveMin, IndicatorSet::default()).await.unwrap();
    scheduler
        .on_five_min_close(FiveMinCloseEvent { start: breakout_start, end: breakout_start + 300 })
        .await;

    // The breakout bar closes five minutes after the configured trigger
    // time, not at it; under exact-match trigger semantics this would never
    // have been dispatched and no order would be placed. An entry plus its
    // stop-loss is two orders.
    assert_eq!(broker.orders_placed.load(Ordering::SeqCst), 2);
}
