//! Master-data orchestrator state (spec.md §3, §4.12): a resumable linear
//! workflow over three steps, one `Process` per `process_date`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepNumber {
    /// Ingest daily candles for the past N days.
    DailyIngest = 1,
    /// Run the universe filter pipeline.
    UniverseFilter = 2,
    /// Ingest 1-minute candles for every stock the filter produced.
    MinuteIngest = 3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    pub process_date: NaiveDate,
    pub status: ProcessStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub process_id: String,
    pub step_number: StepNumber,
    pub status: StepStatus,
    pub error_message: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
}

impl ProcessStep {
    pub fn pending(process_id: impl Into<String>, step_number: StepNumber) -> Self {
        Self {
            process_id: process_id.into(),
            step_number,
            status: StepStatus::Pending,
            error_message: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// A `Running` step older than `grace` relative to `now` is treated as
    /// `Failed` and retried (spec.md §4.12).
    pub fn is_stale(&self, now: NaiveDateTime, grace: chrono::Duration) -> bool {
        match (self.status, self.started_at) {
            (StepStatus::Running, Some(started)) => now - started > grace,
            _ => false,
        }
    }
}
