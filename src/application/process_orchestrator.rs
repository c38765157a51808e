//! Resumable linear workflow over master-data ingestion (spec.md §4.12).
//! Specified only at contract level: the three steps' actual work
//! (broker ingest, universe filtering) lives behind `ProcessStepRunner`.

use crate::domain::ports::ProcessStore;
use crate::domain::process::{Process, ProcessStatus, ProcessStep, StepNumber, StepStatus};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait ProcessStepRunner: Send + Sync {
    async fn run(&self, process_date: NaiveDate) -> Result<(), String>;
}

pub struct ProcessOrchestrator {
    process_store: Arc<dyn ProcessStore>,
    daily_ingest: Arc<dyn ProcessStepRunner>,
    universe_filter: Arc<dyn ProcessStepRunner>,
    minute_ingest: Arc<dyn ProcessStepRunner>,
    grace_period: ChronoDuration,
}

impl ProcessOrchestrator {
    pub fn new(
        process_store: Arc<dyn ProcessStore>,
        daily_ingest: Arc<dyn ProcessStepRunner>,
        universe_filter: Arc<dyn ProcessStepRunner>,
        minute_ingest: Arc<dyn ProcessStepRunner>,
        grace_period: ChronoDuration,
    ) -> Self {
        Self {
            process_store,
            daily_ingest,
            universe_filter,
            minute_ingest,
            grace_period,
        }
    }

    fn runner_for(&self, step_number: StepNumber) -> &Arc<dyn ProcessStepRunner> {
        match step_number {
            StepNumber::DailyIngest => &self.daily_ingest,
            StepNumber::UniverseFilter => &self.universe_filter,
            StepNumber::MinuteIngest => &self.minute_ingest,
        }
    }

    /// Starts, or resumes, the master-data process for `process_date`. At
    /// most one `Process` exists per date; re-runs resume from the first
    /// non-COMPLETED step.
    pub async fn run(&self, process_date: NaiveDate) -> ProcessStatus {
        let process = match self.process_store.find_by_date(process_date).await {
            Some(p) => p,
            None => {
                let p = Process {
                    id: Uuid::new_v4().to_string(),
                    process_date,
                    status: ProcessStatus::Running,
                };
                self.process_store.upsert_process(p.clone()).await;
                p
            }
        };

        let step_order = [StepNumber::DailyIngest, StepNumber::UniverseFilter, StepNumber::MinuteIngest];
        let mut steps = self.process_store.steps(&process.id).await;
        if steps.is_empty() {
            for step_number in step_order {
                let step = ProcessStep::pending(process.id.clone(), step_number);
                self.process_store.upsert_step(step.clone()).await;
                steps.push(step);
            }
        }

        let now = Utc::now().naive_utc();
        let mut final_status = ProcessStatus::Completed;

        for step_number in step_order {
            let step = steps
                .iter()
                .find(|s| s.step_number == step_number)
                .cloned()
                .unwrap_or_else(|| ProcessStep::pending(process.id.clone(), step_number));

            let effective_status = if step.is_stale(now, self.grace_period) {
                StepStatus::Failed
            } else {
                step.status
            };

            if effective_status == StepStatus::Completed {
                continue;
            }

            let mut running = step.clone();
            running.status = StepStatus::Running;
            running.started_at = Some(now);
            running.error_message = None;
            self.process_store.upsert_step(running.clone()).await;

            let runner = self.runner_for(step_number);
            match runner.run(process_date).await {
                Ok(()) => {
                    let mut completed = running;
                    completed.status = StepStatus::Completed;
                    completed.finished_at = Some(Utc::now().naive_utc());
                    self.process_store.upsert_step(completed).await;
                    info!(?step_number, %process_date, "process step completed");
                }
                Err(reason) => {
                    let mut failed = running;
                    failed.status = StepStatus::Failed;
                    failed.error_message = Some(reason.clone());
                    failed.finished_at = Some(Utc::now().naive_utc());
                    self.process_store.upsert_step(failed).await;
                    error!(?step_number, %process_date, error = %reason, "process step failed");
                    final_status = ProcessStatus::Failed;
                    break;
                }
            }
        }

        let mut finished = process;
        finished.status = final_status;
        self.process_store.upsert_process(finished).await;
        final_status
    }
}
