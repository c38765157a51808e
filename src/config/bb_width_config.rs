//! BB-width squeeze monitor configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, Copy)]
pub struct BbWidthEnvConfig {
    pub threshold_margin: f64,
    pub min_contracting_candles: usize,
    pub lookback_candles: usize,
}

impl BbWidthEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            threshold_margin: parse_f64("BB_WIDTH_THRESHOLD_MARGIN", 0.001)?,
            min_contracting_candles: parse_usize("BB_WIDTH_MIN_CONTRACTING_CANDLES", 3)?,
            lookback_candles: parse_usize("BB_WIDTH_LOOKBACK_CANDLES", 5)?,
        })
    }
}

fn parse_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<f64>()
        .context(format!("Failed to parse {key}"))
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .context(format!("Failed to parse {key}"))
}
