//! In-memory reference adapters for every port (spec.md §1, §4.5). A real
//! deployment backs these with a database and broker HTTP clients; these
//! adapters exist so the core is runnable and testable standalone.

use crate::domain::candle::{Candle, Instrument, Interval};
use crate::domain::errors::{GroupCapacityError, StoreConflict};
use crate::domain::group::{EntryType, GroupStatus, StockGroup, MAX_ACTIVE_GROUPS};
use crate::domain::indicators::IndicatorSet;
use crate::domain::ports::{
    BaselineStore, CandleStore, GroupStore, IndicatorStore, InstrumentDirectory, ProcessStore,
};
use crate::domain::process::{Process, ProcessStep};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

type CandleKey = (String, i64, Interval);

#[derive(Default)]
pub struct InMemoryCandleStore {
    candles: RwLock<HashMap<CandleKey, Candle>>,
}

#[async_trait]
impl CandleStore for InMemoryCandleStore {
    async fn upsert(&self, candle: Candle) -> Result<(), StoreConflict> {
        let key = (candle.instrument_key.clone(), candle.timestamp, candle.interval);
        self.candles.write().await.insert(key, candle);
        Ok(())
    }

    async fn range(&self, instrument_key: &str, interval: Interval, from: i64, to: i64) -> Vec<Candle> {
        let store = self.candles.read().await;
        let mut out: Vec<Candle> = store
            .values()
            .filter(|c| c.instrument_key == instrument_key && c.interval == interval && c.timestamp >= from && c.timestamp < to)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.timestamp);
        out
    }

    async fn tail(&self, instrument_key: &str, interval: Interval, n: usize) -> Vec<Candle> {
        let store = self.candles.read().await;
        let mut matching: Vec<Candle> = store
            .values()
            .filter(|c| c.instrument_key == instrument_key && c.interval == interval)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.timestamp);
        let start = matching.len().saturating_sub(n);
        matching[start..].to_vec()
    }
}

type IndicatorKey = (String, i64, Interval);

#[derive(Default)]
pub struct InMemoryIndicatorStore {
    sets: RwLock<HashMap<IndicatorKey, IndicatorSet>>,
}

#[async_trait]
impl IndicatorStore for InMemoryIndicatorStore {
    async fn upsert(
        &self,
        instrument_key: &str,
        timestamp: i64,
        interval: Interval,
        indicators: IndicatorSet,
    ) -> Result<(), StoreConflict> {
        self.sets
            .write()
            .await
            .insert((instrument_key.to_string(), timestamp, interval), indicators);
        Ok(())
    }

    async fn get(&self, instrument_key: &str, timestamp: i64, interval: Interval) -> Option<IndicatorSet> {
        self.sets
            .read()
            .await
            .get(&(instrument_key.to_string(), timestamp, interval))
            .copied()
    }
}

pub struct InMemoryGroupStore {
    groups: RwLock<HashMap<String, StockGroup>>,
    max_active: usize,
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new(MAX_ACTIVE_GROUPS)
    }
}

impl InMemoryGroupStore {
    pub fn new(max_active: usize) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            max_active,
        }
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn active_groups_by_entry_type(&self, entry_type: EntryType) -> Vec<StockGroup> {
        self.groups
            .read()
            .await
            .values()
            .filter(|g| g.entry_type == entry_type && g.is_active())
            .cloned()
            .collect()
    }

    async fn all(&self) -> Vec<StockGroup> {
        self.groups.read().await.values().cloned().collect()
    }

    async fn upsert(&self, group: StockGroup) -> Result<(), GroupCapacityError> {
        let mut groups = self.groups.write().await;
        if group.status == GroupStatus::Executing {
            let currently_active = groups
                .values()
                .filter(|g| g.id != group.id && g.status == GroupStatus::Executing)
                .count();
            if currently_active >= self.max_active {
                return Err(GroupCapacityError {
                    id: group.id,
                    max_active: self.max_active,
                    currently_active,
                });
            }
        }
        groups.insert(group.id.clone(), group);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProcessStore {
    processes: RwLock<HashMap<NaiveDate, Process>>,
    steps: RwLock<HashMap<String, Vec<ProcessStep>>>,
}

#[async_trait]
impl ProcessStore for InMemoryProcessStore {
    async fn find_by_date(&self, process_date: NaiveDate) -> Option<Process> {
        self.processes.read().await.get(&process_date).cloned()
    }

    async fn upsert_process(&self, process: Process) {
        self.processes.write().await.insert(process.process_date, process);
    }

    async fn upsert_step(&self, step: ProcessStep) {
        let mut steps = self.steps.write().await;
        let entry = steps.entry(step.process_id.clone()).or_default();
        if let Some(existing) = entry.iter_mut().find(|s| s.step_number == step.step_number) {
            *existing = step;
        } else {
            entry.push(step);
        }
    }

    async fn steps(&self, process_id: &str) -> Vec<ProcessStep> {
        self.steps.read().await.get(process_id).cloned().unwrap_or_default()
    }
}

/// Reference `BaselineStore`: a fixed in-memory map. Real deployments read
/// this from an offline analysis job's output (spec.md §9).
#[derive(Default)]
pub struct InMemoryBaselineStore {
    baselines: RwLock<HashMap<String, f64>>,
}

impl InMemoryBaselineStore {
    pub fn from_map(baselines: HashMap<String, f64>) -> Self {
        Self { baselines: RwLock::new(baselines) }
    }

    pub async fn set(&self, instrument_key: &str, value: f64) {
        self.baselines.write().await.insert(instrument_key.to_string(), value);
    }
}

#[async_trait]
impl BaselineStore for InMemoryBaselineStore {
    async fn lowest_bb_width(&self, instrument_key: &str) -> Option<f64> {
        self.baselines.read().await.get(instrument_key).copied()
    }
}

#[derive(Default)]
pub struct InMemoryInstrumentDirectory {
    instruments: RwLock<HashMap<String, Instrument>>,
}

impl InMemoryInstrumentDirectory {
    pub fn from_map(instruments: HashMap<String, Instrument>) -> Self {
        Self { instruments: RwLock::new(instruments) }
    }

    pub async fn register(&self, instrument: Instrument) {
        self.instruments.write().await.insert(instrument.instrument_key.clone(), instrument);
    }
}

#[async_trait]
impl InstrumentDirectory for InMemoryInstrumentDirectory {
    async fn resolve(&self, instrument_key: &str) -> Option<Instrument> {
        self.instruments.read().await.get(instrument_key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn candle_store_upsert_is_idempotent() {
        let store = InMemoryCandleStore::default();
        let candle = Candle::new("NSE:X", 0, Interval::OneMin, dec!(1), dec!(2), dec!(1), dec!(1), dec!(10)).unwrap();
        store.upsert(candle.clone()).await.unwrap();
        store.upsert(candle.clone()).await.unwrap();
        let tail = store.tail("NSE:X", Interval::OneMin, 10).await;
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn tail_returns_ascending_order() {
        let store = InMemoryCandleStore::default();
        for ts in [120, 0, 60] {
            let candle = Candle::new("NSE:X", ts, Interval::OneMin, dec!(1), dec!(2), dec!(1), dec!(1), dec!(10)).unwrap();
            store.upsert(candle).await.unwrap();
        }
        let tail = store.tail("NSE:X", Interval::OneMin, 2).await;
        assert_eq!(tail.iter().map(|c| c.timestamp).collect::<Vec<_>>(), vec![60, 120]);
    }

    fn executing_group(id: &str) -> StockGroup {
        StockGroup {
            id: id.into(),
            name: id.into(),
            entry_type: EntryType::ImmediateBreakout,
            status: GroupStatus::Executing,
            instrument_keys: vec!["NSE:X".into()],
        }
    }

    #[tokio::test]
    async fn rejects_a_fourth_executing_group_beyond_the_cap() {
        let store = InMemoryGroupStore::new(3);
        store.upsert(executing_group("g1")).await.unwrap();
        store.upsert(executing_group("g2")).await.unwrap();
        store.upsert(executing_group("g3")).await.unwrap();

        let err = store.upsert(executing_group("g4")).await.unwrap_err();
        assert_eq!(err.max_active, 3);
        assert_eq!(err.currently_active, 3);
        assert_eq!(store.all().await.len(), 3);
    }

    #[tokio::test]
    async fn re_upserting_an_already_executing_group_does_not_count_against_itself() {
        let store = InMemoryGroupStore::new(1);
        store.upsert(executing_group("g1")).await.unwrap();
        store.upsert(executing_group("g1")).await.unwrap();
        assert_eq!(store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn non_executing_groups_never_count_against_the_cap() {
        let store = InMemoryGroupStore::new(1);
        let mut pending = executing_group("g1");
        pending.status = GroupStatus::Pending;
        store.upsert(pending).await.unwrap();
        store.upsert(executing_group("g2")).await.unwrap();
        assert_eq!(store.all().await.len(), 2);
    }
}
