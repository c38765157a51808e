//! Tick scheduler configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerEnvConfig {
    pub minute_offset_seconds: u64,
    pub per_instrument_timeout_seconds: u64,
    pub worker_pool_size: Option<usize>,
}

impl SchedulerEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            minute_offset_seconds: parse_u64("SCHEDULER_MINUTE_OFFSET_SECONDS", 8)?,
            per_instrument_timeout_seconds: parse_u64("SCHEDULER_PER_INSTRUMENT_TIMEOUT_SECONDS", 5)?,
            worker_pool_size: match env::var("SCHEDULER_WORKER_POOL_SIZE") {
                Ok(v) => Some(v.parse::<usize>().context("Failed to parse SCHEDULER_WORKER_POOL_SIZE")?),
                Err(_) => None,
            },
        })
    }
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .context(format!("Failed to parse {key}"))
}
