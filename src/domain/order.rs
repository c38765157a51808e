//! Orders placed through the `BrokerClient` port (spec.md §4.9, §6).

use crate::domain::signal::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl From<Direction> for OrderSide {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }
}

/// An order ready for the broker. Carries `security_id`, never `symbol`
/// (spec.md §4.9 — orders keyed by symbol are a known source defect).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Idempotency identity: at most one order per (group, instrument,
    /// candle_close_time) ever reaches the broker (spec.md §4.9).
    pub idempotency_key: String,
    pub security_id: String,
    pub instrument_key: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub price: Decimal,
    /// Set when this order is the stop-loss companion of an entry fill.
    pub is_stop_loss: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub broker_order_id: String,
    pub idempotency_key: String,
    pub filled_price: Option<Decimal>,
}
