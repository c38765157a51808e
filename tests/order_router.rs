//! Drives `OrderRouter` against multiple instruments and group ids
//! concurrently, rather than the single-instrument sequencing its own
//! unit tests cover, to confirm the idempotency key is scoped per
//! (group, instrument, close time) and not shared globally.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use intraday_core::domain::candle::{Candle, DirectionBias, Instrument};
use intraday_core::domain::errors::BrokerError;
use intraday_core::domain::order::{Order, OrderReceipt};
use intraday_core::domain::ports::{BrokerClient, InstrumentDirectory};
use intraday_core::domain::signal::{AnalysisContext, Direction, Signal, SignalKind};
use intraday_core::application::order_router::{OrderRouter, OrderRouterConfig};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct RecordingBroker {
    calls: AtomicUsize,
}

#[async_trait]
impl BrokerClient for RecordingBroker {
    async fn fetch_latest_minute(&self, _instrument_key: &str, _as_of: NaiveDateTime) -> Result<Candle, BrokerError> {
        unimplemented!("not exercised by this test")
    }

    async fn place_order(&self, order: &Order) -> Result<OrderReceipt, BrokerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OrderReceipt {
            broker_order_id: format!("B{}", self.calls.load(Ordering::SeqCst)),
            idempotency_key: order.idempotency_key.clone(),
            filled_price: Some(order.price),
        })
    }
}

struct MapDirectory(HashMap<String, Instrument>);

#[async_trait]
impl InstrumentDirectory for MapDirectory {
    async fn resolve(&self, instrument_key: &str) -> Option<Instrument> {
        self.0.get(instrument_key).cloned()
    }
}

fn instrument(instrument_key: &str, security_id: &str) -> Instrument {
    Instrument {
        instrument_key: instrument_key.into(),
        symbol: "X".into(),
        security_id: security_id.into(),
        exchange: "NSE".into(),
        direction_bias: DirectionBias::None,
    }
}

fn signal(instrument_key: &str, timestamp: i64) -> Signal {
    Signal {
        instrument_key: instrument_key.into(),
        kind: SignalKind::ImmediateBreakout,
        direction: Direction::Long,
        timestamp,
        entry_price: dec!(200.14),
        stop_loss: dec!(195.0),
        context: AnalysisContext::default(),
    }
}

#[tokio::test]
async fn the_same_instrument_in_two_different_groups_is_not_deduplicated_against_itself() {
    let broker = Arc::new(RecordingBroker { calls: AtomicUsize::new(0) });
    let directory = Arc::new(MapDirectory(HashMap::from([("NSE:X".to_string(), instrument("NSE:X", "100245"))])));
    let router = OrderRouter::new(broker.clone(), directory, OrderRouterConfig::default());

    router.route("group-a", signal("NSE:X", 1_704_086_400)).await.unwrap();
    router.route("group-b", signal("NSE:X", 1_704_086_400)).await.unwrap();

    // Same instrument and close time, but distinct groups: each routes
    // its own entry + stop-loss pair, four calls total.
    assert_eq!(broker.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn distinct_instruments_in_the_same_group_each_place_their_own_orders() {
    let broker = Arc::new(RecordingBroker { calls: AtomicUsize::new(0) });
    let directory = Arc::new(MapDirectory(HashMap::from([
        ("NSE:A".to_string(), instrument("NSE:A", "1")),
        ("NSE:B".to_string(), instrument("NSE:B", "2")),
    ])));
    let router = OrderRouter::new(broker.clone(), directory, OrderRouterConfig::default());

    router.route("group-1", signal("NSE:A", 1_704_086_400)).await.unwrap();
    router.route("group-1", signal("NSE:B", 1_704_086_400)).await.unwrap();

    assert_eq!(broker.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn an_instrument_with_a_blank_security_id_is_rejected_with_a_typed_error() {
    let broker = Arc::new(RecordingBroker { calls: AtomicUsize::new(0) });
    let directory = Arc::new(MapDirectory(HashMap::from([("NSE:X".to_string(), instrument("NSE:X", ""))])));
    let router = OrderRouter::new(broker.clone(), directory, OrderRouterConfig::default());

    let err = router.route("group-1", signal("NSE:X", 1_704_086_400)).await.unwrap_err();

    assert_eq!(err.instrument_key, "NSE:X");
    assert_eq!(broker.calls.load(Ordering::SeqCst), 0);
}
