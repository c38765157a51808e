//! Headless bootstrap: wires calendar, stores, schedulers, evaluators,
//! order router, BB-width monitor and alert service into a running
//! system, modeled on the teacher's `application::system::Application` /
//! `src/bin/server.rs` split between "build" (construct, don't run yet)
//! and "start" (spawn background tasks, return a handle).

use crate::application::alert_service::{AlertService, AlertServiceConfig};
use crate::application::bb_width_monitor::BbWidthMonitor;
use crate::application::bootstrap::BootstrapData;
use crate::application::group_scheduler::GroupExecutionScheduler;
use crate::application::market_data::event_bus::EventBus;
use crate::application::market_data::tick_scheduler::{SchedulerConfig, TickScheduler};
use crate::application::order_router::{OrderRouter, OrderRouterConfig};
use crate::application::process_orchestrator::{ProcessOrchestrator, ProcessStepRunner};
use crate::config::Config;
use crate::domain::calendar::TradingCalendar;
use crate::domain::ports::{BaselineStore, BrokerClient, CandleStore, GroupStore, IndicatorStore, InstrumentDirectory, ProcessStore};
use crate::infrastructure::audio;
use crate::infrastructure::broker::MockBrokerClient;
use crate::infrastructure::memory::{
    InMemoryBaselineStore, InMemoryCandleStore, InMemoryGroupStore, InMemoryIndicatorStore,
    InMemoryInstrumentDirectory, InMemoryProcessStore,
};
use crate::infrastructure::observability::{Metrics, MetricsReporter};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// The three master-data steps are out of this core's scope (spec.md
/// §1); this no-op runner lets `ProcessOrchestrator` run end to end
/// against a universe that `BootstrapData` has already populated.
struct NoopStepRunner;

#[async_trait]
impl ProcessStepRunner for NoopStepRunner {
    async fn run(&self, _process_date: NaiveDate) -> Result<(), String> {
        Ok(())
    }
}

/// Handle returned by `Application::start`. Dropping it does not stop the
/// background tasks; call `shutdown()` or cancel via `ctrl_c` instead.
pub struct SystemHandle {
    pub candle_store: Arc<dyn CandleStore>,
    pub indicator_store: Arc<dyn IndicatorStore>,
    pub group_store: Arc<dyn GroupStore>,
    pub alert_service: Arc<AlertService>,
    pub metrics: Metrics,
    cancel_tx: watch::Sender<bool>,
}

impl SystemHandle {
    pub fn shutdown(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

pub struct Application {
    config: Config,
    candle_store: Arc<dyn CandleStore>,
    indicator_store: Arc<dyn IndicatorStore>,
    group_store: Arc<dyn GroupStore>,
    tick_scheduler: Arc<TickScheduler>,
    process_orchestrator: Arc<ProcessOrchestrator>,
    alert_service: Arc<AlertService>,
    metrics: Metrics,
}

impl Application {
    pub async fn build(config: Config, bootstrap: BootstrapData) -> Result<Self> {
        info!("building trading application");

        let calendar = Arc::new(TradingCalendar::new(bootstrap.holidays, bootstrap.earliest_known_trading_day));

        let candle_store: Arc<dyn CandleStore> = Arc::new(InMemoryCandleStore::default());
        let indicator_store: Arc<dyn IndicatorStore> = Arc::new(InMemoryIndicatorStore::default());
        let process_store: Arc<dyn ProcessStore> = Arc::new(InMemoryProcessStore::default());
        let baseline_store: Arc<dyn BaselineStore> = Arc::new(InMemoryBaselineStore::from_map(bootstrap.baselines));

        let group_store: Arc<dyn GroupStore> = Arc::new(InMemoryGroupStore::new(config.group.max_active_groups));
        for group in bootstrap.groups {
            let group_id = group.id.clone();
            if let Err(err) = group_store.upsert(group).await {
                warn!(group = %group_id, error = %err, "dropping seeded group over the active-group cap");
            }
        }

        let mut instruments_by_key = std::collections::HashMap::new();
        for instrument in &bootstrap.instruments {
            instruments_by_key.insert(instrument.instrument_key.clone(), instrument.clone());
        }
        let instrument_directory: Arc<dyn InstrumentDirectory> =
            Arc::new(InMemoryInstrumentDirectory::from_map(instruments_by_key));

        let broker: Arc<dyn BrokerClient> = Arc::new(MockBrokerClient::new(bootstrap.opening_prices));

        let playback_chain = if config.alert.enabled {
            audio::default_chain(config.alert.sound_path.clone())
        } else {
            Vec::new()
        };
        let alert_service = Arc::new(AlertService::new(
            AlertServiceConfig {
                cooldown_seconds: config.alert.cooldown_seconds,
                max_alerts_per_hour: config.alert.max_alerts_per_hour,
                ..AlertServiceConfig::default()
            },
            playback_chain,
        ));

        let bb_width_monitor = Arc::new(BbWidthMonitor::new(
            candle_store.clone(),
            indicator_store.clone(),
            baseline_store.clone(),
            alert_service.clone(),
        ));

        let order_router = Arc::new(OrderRouter::new(broker.clone(), instrument_directory.clone(), OrderRouterConfig::default()));

        let group_scheduler = GroupExecutionScheduler::new(
            config.group.entry_trigger_times.clone(),
            group_store.clone(),
            candle_store.clone(),
            indicator_store.clone(),
            baseline_store.clone(),
            instrument_directory.clone(),
            order_router,
            bb_width_monitor,
        );

        let mut event_bus = EventBus::new();
        event_bus.register_listener(Arc::new(group_scheduler));
        let event_bus = Arc::new(event_bus);

        let scheduler_config = SchedulerConfig {
            minute_offset_seconds: config.scheduler.minute_offset_seconds,
            per_instrument_timeout_seconds: config.scheduler.per_instrument_timeout_seconds,
            worker_pool_size: config.scheduler.worker_pool_size.unwrap_or_else(|| SchedulerConfig::default().worker_pool_size),
        };
        let tick_scheduler = Arc::new(TickScheduler::new(
            broker.clone(),
            candle_store.clone(),
            indicator_store.clone(),
            calendar.clone(),
            event_bus.clone(),
            bootstrap.instruments,
            scheduler_config,
        ));

        let process_orchestrator = Arc::new(ProcessOrchestrator::new(
            process_store.clone(),
            Arc::new(NoopStepRunner),
            Arc::new(NoopStepRunner),
            Arc::new(NoopStepRunner),
            chrono::Duration::hours(2),
        ));

        let metrics = Metrics::new()?;

        Ok(Self {
            config,
            candle_store,
            indicator_store,
            group_store,
            tick_scheduler,
            process_orchestrator,
            alert_service,
            metrics,
        })
    }

    /// Runs the master-data process for `process_date` before the
    /// scheduler starts. Out of scope steps are no-ops by default.
    pub async fn run_master_data_process(&self, process_date: NaiveDate) -> crate::domain::process::ProcessStatus {
        self.process_orchestrator.run(process_date).await
    }

    pub async fn start(self) -> Result<SystemHandle> {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let scheduler = self.tick_scheduler.clone();
        tokio::spawn(async move {
            scheduler.run(cancel_rx).await;
        });
        info!("tick scheduler started");

        if self.config.observability_enabled {
            let reporter = MetricsReporter::new(self.alert_service.clone(), self.metrics.clone(), self.config.observability_interval_seconds);
            tokio::spawn(async move {
                reporter.run().await;
            });
            info!(interval = self.config.observability_interval_seconds, "metrics reporter started");
        }

        Ok(SystemHandle {
            candle_store: self.candle_store,
            indicator_store: self.indicator_store,
            group_store: self.group_store,
            alert_service: self.alert_service,
            metrics: self.metrics,
            cancel_tx,
        })
    }
}
