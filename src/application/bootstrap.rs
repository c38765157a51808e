//! Seed data the core needs beyond environment configuration: the tradable
//! universe, pre-formed groups, per-instrument volatility baselines, and
//! the trading calendar's holiday set. Populating these from a real
//! master-data ingest (daily ingest / universe filter / minute ingest) is
//! out of this core's scope (spec.md §1); `Application::build` takes
//! whatever `BootstrapData` the caller already has.

use crate::domain::candle::Instrument;
use crate::domain::group::StockGroup;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct BootstrapData {
    pub instruments: Vec<Instrument>,
    pub groups: Vec<StockGroup>,
    pub baselines: HashMap<String, f64>,
    pub opening_prices: HashMap<String, Decimal>,
    pub holidays: HashSet<NaiveDate>,
    pub earliest_known_trading_day: NaiveDate,
}

impl BootstrapData {
    /// An empty universe: a calendar with no holidays and no instruments,
    /// groups, or baselines. Useful for tests and for a process that will
    /// populate the stores itself after `Application::build`.
    pub fn empty() -> Self {
        Self {
            instruments: Vec::new(),
            groups: Vec::new(),
            baselines: HashMap::new(),
            opening_prices: HashMap::new(),
            holidays: HashSet::new(),
            earliest_known_trading_day: NaiveDate::from_ymd_opt(2020, 1, 1)
                .expect("2020-01-01 is always a valid date"),
        }
    }
}
