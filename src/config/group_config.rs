//! Stock-group execution configuration: per-entry-type trigger times and
//! the concurrent active-group cap.

use crate::domain::group::{EntryType, MAX_ACTIVE_GROUPS};
use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use std::collections::HashMap;
use std::env;

#[derive(Debug, Clone)]
pub struct GroupEnvConfig {
    /// Close-time trigger, "HH:MM", per entry type that fires on a fixed
    /// clock rather than on every 5-minute close.
    pub entry_trigger_times: HashMap<EntryType, NaiveTime>,
    pub max_active_groups: usize,
}

impl GroupEnvConfig {
    pub fn from_env() -> Result<Self> {
        let mut entry_trigger_times = HashMap::new();
        entry_trigger_times.insert(
            EntryType::ImmediateBreakout,
            parse_hhmm("ENTRY_TRIGGER_IMMEDIATE_BREAKOUT", "09:20")?,
        );
        entry_trigger_times.insert(
            EntryType::TimeOfDayBreakout,
            parse_hhmm("ENTRY_TRIGGER_TIME_OF_DAY_BREAKOUT", "10:00")?,
        );

        Ok(Self {
            entry_trigger_times,
            max_active_groups: parse_usize("GROUPS_MAX_ACTIVE", MAX_ACTIVE_GROUPS)?,
        })
    }
}

fn parse_hhmm(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&raw, "%H:%M").with_context(|| format!("Failed to parse {key} as HH:MM"))
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    let value = env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .context(format!("Failed to parse {key}"))?;
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = GroupEnvConfig::from_env().expect("should parse with defaults");
        assert_eq!(config.max_active_groups, MAX_ACTIVE_GROUPS);
        assert_eq!(
            config.entry_trigger_times[&EntryType::ImmediateBreakout],
            NaiveTime::from_hms_opt(9, 20, 0).unwrap()
        );
    }
}
