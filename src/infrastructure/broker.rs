//! Reference `BrokerClient`: a deterministic random walk in place of a
//! live broker feed, plus order placement that always fills at the
//! requested price. Used by `Application::build`'s default wiring and by
//! integration tests; a real deployment replaces this with an HTTP
//! adapter built on `infrastructure::http`.

use crate::domain::candle::{Candle, Interval};
use crate::domain::errors::BrokerError;
use crate::domain::order::{Order, OrderReceipt};
use crate::domain::ports::BrokerClient;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct MockBrokerClient {
    last_price: Mutex<HashMap<String, Decimal>>,
}

impl MockBrokerClient {
    pub fn new(opening_prices: HashMap<String, Decimal>) -> Self {
        Self { last_price: Mutex::new(opening_prices) }
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    async fn fetch_latest_minute(&self, instrument_key: &str, as_of: NaiveDateTime) -> Result<Candle, BrokerError> {
        let mut prices = self.last_price.lock().await;
        let base = *prices.get(instrument_key).unwrap_or(&Decimal::from(100));

        let step_pct = rand::rng().random_range(-0.003..=0.003);
        let step = base * Decimal::from_f64(step_pct).unwrap_or(Decimal::ZERO);
        let close = (base + step).max(Decimal::from_f64(0.05).expect("static literal"));
        let high = close.max(base);
        let low = close.min(base);
        let volume = Decimal::from(rand::rng().random_range(100..5000));

        prices.insert(instrument_key.to_string(), close);

        Candle::new(instrument_key, as_of.and_utc().timestamp(), Interval::OneMin, base, high, low, close, volume)
            .map_err(|err| BrokerError::Transient { reason: err.to_string() })
    }

    async fn place_order(&self, order: &Order) -> Result<OrderReceipt, BrokerError> {
        Ok(OrderReceipt {
            broker_order_id: Uuid::new_v4().to_string(),
            idempotency_key: order.idempotency_key.clone(),
            filled_price: Some(order.price),
        })
    }
}
