//! Translates Signals into broker orders, enforcing at-most-once
//! execution per (group, instrument, candle_close_time), correct broker
//! identity, and retry policy (spec.md §4.9).

use crate::domain::errors::{BrokerError, OrderIdentityError};
use crate::domain::order::{Order, OrderSide};
use crate::domain::ports::{BrokerClient, InstrumentDirectory};
use crate::domain::signal::Signal;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct OrderRouterConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Quantity per entry order; sizing is out of this core's scope.
    pub default_quantity: u32,
}

impl Default for OrderRouterConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_backoff_ms: 200,
            max_backoff_ms: 10_000,
            default_quantity: 1,
        }
    }
}

pub struct OrderRouter {
    broker: Arc<dyn BrokerClient>,
    instrument_directory: Arc<dyn InstrumentDirectory>,
    config: OrderRouterConfig,
    placed: Mutex<HashSet<String>>,
}

impl OrderRouter {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        instrument_directory: Arc<dyn InstrumentDirectory>,
        config: OrderRouterConfig,
    ) -> Self {
        Self {
            broker,
            instrument_directory,
            config,
            placed: Mutex::new(HashSet::new()),
        }
    }

    /// Routes one signal for `group_id`. Returns on any terminal failure;
    /// the caller (`GroupExecutionScheduler`) does not retry.
    pub async fn route(&self, group_id: &str, signal: Signal) -> Result<(), OrderIdentityError> {
        let idempotency_key = format!("{}:{}:{}", group_id, signal.instrument_key, signal.timestamp);

        {
            let mut placed = self.placed.lock().await;
            if !placed.insert(idempotency_key.clone()) {
                info!(key = %idempotency_key, "order already placed for this (group, instrument, candle_close_time)");
                return Ok(());
            }
        }

        let Some(instrument) = self.instrument_directory.resolve(&signal.instrument_key).await else {
            return Err(OrderIdentityError { instrument_key: signal.instrument_key.clone() });
        };
        if instrument.security_id.is_empty() {
            return Err(OrderIdentityError { instrument_key: signal.instrument_key.clone() });
        }

        let entry_order = Order {
            idempotency_key: idempotency_key.clone(),
            security_id: instrument.security_id.clone(),
            instrument_key: signal.instrument_key.clone(),
            side: OrderSide::from(signal.direction),
            quantity: self.config.default_quantity,
            price: signal.entry_price,
            is_stop_loss: false,
        };

        match self.place_with_retry(&entry_order).await {
            Ok(_) => {
                if signal.stop_loss != Decimal::ZERO {
                    let stop_order = Order {
                        idempotency_key: format!("{idempotency_key}:stop"),
                        is_stop_loss: true,
                        price: signal.stop_loss,
                        side: opposite(entry_order.side),
                        ..entry_order
                    };
                    if let Err(err) = self.place_with_retry(&stop_order).await {
                        error!(key = %idempotency_key, error = %err, "stop-loss order failed");
                    }
                }
            }
            Err(err) => {
                error!(key = %idempotency_key, error = %err, "entry order failed");
            }
        }

        Ok(())
    }

    async fn place_with_retry(&self, order: &Order) -> Result<(), BrokerError> {
        let mut attempt = 0;
        loop {
            match self.broker.place_order(order).await {
                Ok(_) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = backoff_with_jitter(attempt, self.config.base_backoff_ms, self.config.max_backoff_ms);
                    warn!(attempt, delay_ms = delay, error = %err, "retrying order after transient broker error");
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn opposite(side: OrderSide) -> OrderSide {
    match side {
        OrderSide::Buy => OrderSide::Sell,
        OrderSide::Sell => OrderSide::Buy,
    }
}

fn backoff_with_jitter(attempt: u32, base_ms: u64, cap_ms: u64) -> u64 {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16)).min(cap_ms);
    rand::rng().random_range(0..=exp.max(1))
}
