//! Configuration module. Structured environment-variable loading,
//! organized by domain: scheduler, BB-width monitor, alerts, groups.

mod alert_config;
mod bb_width_config;
mod group_config;
mod scheduler_config;

pub use alert_config::AlertEnvConfig;
pub use bb_width_config::BbWidthEnvConfig;
pub use group_config::GroupEnvConfig;
pub use scheduler_config::SchedulerEnvConfig;

use anyhow::Result;

/// Aggregate configuration for the whole core, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub scheduler: SchedulerEnvConfig,
    pub bb_width: BbWidthEnvConfig,
    pub alert: AlertEnvConfig,
    pub group: GroupEnvConfig,
    pub observability_enabled: bool,
    pub observability_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            scheduler: SchedulerEnvConfig::from_env()?,
            bb_width: BbWidthEnvConfig::from_env()?,
            alert: AlertEnvConfig::from_env()?,
            group: GroupEnvConfig::from_env()?,
            observability_enabled: parse_bool("OBSERVABILITY_ENABLED", true),
            observability_interval_seconds: parse_u64("OBSERVABILITY_INTERVAL_SECONDS", 60)?,
        })
    }
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    use anyhow::Context;
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .context(format!("Failed to parse {key}"))
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<bool>()
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_succeeds_with_no_variables_set() {
        let config = Config::from_env().expect("defaults should always parse");
        assert_eq!(config.scheduler.minute_offset_seconds, 8);
        assert!(config.observability_enabled);
    }
}
