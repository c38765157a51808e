//! Alert dedup/cooldown/playback configuration parsing from environment
//! variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AlertEnvConfig {
    pub cooldown_seconds: i64,
    pub max_alerts_per_hour: usize,
    pub sound_path: Option<String>,
    pub enabled: bool,
}

impl AlertEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cooldown_seconds: parse_i64("ALERT_COOLDOWN_SECONDS", 180)?,
            max_alerts_per_hour: parse_usize("ALERT_MAX_ALERTS_PER_HOUR", 100)?,
            sound_path: env::var("ALERT_SOUND_PATH").ok(),
            enabled: parse_bool("ALERT_ENABLED", true),
        })
    }
}

fn parse_i64(key: &str, default: i64) -> Result<i64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<i64>()
        .context(format!("Failed to parse {key}"))
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .context(format!("Failed to parse {key}"))
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<bool>()
        .unwrap_or(default)
}
