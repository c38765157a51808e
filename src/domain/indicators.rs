//! Pure, deterministic computation of the indicator set over an ordered
//! candle slice (spec.md §4.2). Same input sequence, same output bytes:
//! no hidden state, no wall-clock reads, no RNG.

use crate::domain::candle::Candle;
use crate::domain::errors::IndicatorInputError;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Indicator values attached to a single candle. `None` during warm-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub ema5: Option<f64>,
    pub ema9: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ma9: Option<f64>,
    pub rsi14: Option<f64>,
    pub atr14: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width: Option<f64>,
    pub vwap: Option<f64>,
}

const RSI_PERIOD: usize = 14;
const ATR_PERIOD: usize = 14;
const BB_PERIOD: usize = 20;
const BB_STD_DEV: f64 = 2.0;

/// Stateless computation over ordered candle slices.
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Computes the full indicator set for every candle in `candles`,
    /// one `IndicatorSet` per input index, in input order.
    pub fn compute(candles: &[Candle]) -> Result<Vec<IndicatorSet>, IndicatorInputError> {
        let closes = to_f64_column(candles, |c| c.close)?;
        let highs = to_f64_column(candles, |c| c.high)?;
        let lows = to_f64_column(candles, |c| c.low)?;
        let volumes = to_f64_column(candles, |c| c.volume)?;
        let typical: Vec<f64> = candles.iter().map(|c| {
            // high/low/close already validated finite above.
            c.typical_price().to_f64().unwrap_or(f64::NAN)
        }).collect();

        let ema5 = ema(&closes, 5);
        let ema9 = ema(&closes, 9);
        let ema20 = ema(&closes, 20);
        let ema50 = ema(&closes, 50);
        let ma9 = sma(&closes, 9);
        let rsi14 = rsi(&closes, RSI_PERIOD);
        let atr14 = atr(&highs, &lows, &closes, ATR_PERIOD);
        let (bb_upper, bb_middle, bb_lower, bb_width) = bollinger(&closes, BB_PERIOD, BB_STD_DEV);
        let vwap = vwap(candles, &typical, &volumes);

        Ok((0..candles.len())
            .map(|i| IndicatorSet {
                ema5: ema5[i],
                ema9: ema9[i],
                ema20: ema20[i],
                ema50: ema50[i],
                ma9: ma9[i],
                rsi14: rsi14[i],
                atr14: atr14[i],
                bb_upper: bb_upper[i],
                bb_middle: bb_middle[i],
                bb_lower: bb_lower[i],
                bb_width: bb_width[i],
                vwap: vwap[i],
            })
            .collect())
    }
}

fn to_f64_column(
    candles: &[Candle],
    pick: impl Fn(&Candle) -> rust_decimal::Decimal,
) -> Result<Vec<f64>, IndicatorInputError> {
    candles
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let d = pick(c);
            d.to_f64()
                .filter(|v| v.is_finite())
                .ok_or(IndicatorInputError::NonFinite {
                    index,
                    value: d.to_f64().unwrap_or(f64::NAN),
                })
        })
        .collect()
}

/// Simple moving average of the last `n` closes. `None` for index < n-1.
pub fn sma(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if i + 1 < n {
                None
            } else {
                Some(closes[i + 1 - n..=i].iter().sum::<f64>() / n as f64)
            }
        })
        .collect()
}

/// EMA(n): seeded by SMA(n) at index n-1, then the standard recurrence.
pub fn ema(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    let k = 2.0 / (n as f64 + 1.0);
    let sma_seed = sma(closes, n);
    let mut out = vec![None; closes.len()];
    let mut prev: Option<f64> = None;
    for i in 0..closes.len() {
        prev = match (prev, sma_seed[i]) {
            (Some(p), _) => Some(closes[i] * k + p * (1.0 - k)),
            (None, Some(seed)) => Some(seed),
            (None, None) => None,
        };
        out[i] = prev;
    }
    out
}

/// Population standard deviation (N denominator) of the last `n` closes,
/// plus the Bollinger upper/middle/lower/width series. Population sigma is
/// the convention this engine commits to (spec.md §4.2, §9 open question).
pub fn bollinger(
    closes: &[f64],
    n: usize,
    num_std_dev: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle = sma(closes, n);
    let len = closes.len();
    let mut upper = vec![None; len];
    let mut lower = vec![None; len];
    let mut width = vec![None; len];

    for i in 0..len {
        if let Some(mid) = middle[i] {
            let window = &closes[i + 1 - n..=i];
            let variance = window.iter().map(|v| (v - mid).powi(2)).sum::<f64>() / n as f64;
            let sigma = variance.sqrt();
            let up = mid + num_std_dev * sigma;
            let lo = mid - num_std_dev * sigma;
            upper[i] = Some(up);
            lower[i] = Some(lo);
            // A constant-price window (sigma == 0) is non-tradeable, not a
            // division error: report bb_width = 0 rather than dividing by a
            // zero-or-near-zero middle.
            width[i] = Some(if mid == 0.0 { 0.0 } else { (up - lo) / mid });
        }
    }

    (upper, middle, lower, width)
}

/// Wilder RSI(n). `None` until the (n+1)-th close (n deltas observed).
pub fn rsi(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    let len = closes.len();
    let mut out = vec![None; len];
    if len <= n {
        return out;
    }

    let deltas: Vec<f64> = (1..len).map(|i| closes[i] - closes[i - 1]).collect();
    let gain = |d: f64| d.max(0.0);
    let loss = |d: f64| (-d).max(0.0);

    // Seed: simple mean of the first n deltas (closes[0..=n]).
    let mut avg_gain = deltas[0..n].iter().copied().map(gain).sum::<f64>() / n as f64;
    let mut avg_loss = deltas[0..n].iter().copied().map(loss).sum::<f64>() / n as f64;
    out[n] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in n + 1..len {
        let d = deltas[i - 1];
        avg_gain = (avg_gain * (n as f64 - 1.0) + gain(d)) / n as f64;
        avg_loss = (avg_loss * (n as f64 - 1.0) + loss(d)) / n as f64;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Wilder ATR(n): true range smoothed the same way as RSI's averages.
/// `None` until index n-1 (n true-range observations).
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], n: usize) -> Vec<Option<f64>> {
    let len = highs.len();
    let mut out = vec![None; len];
    if len < n {
        return out;
    }

    let tr: Vec<f64> = (0..len)
        .map(|i| {
            if i == 0 {
                highs[0] - lows[0]
            } else {
                let hl = highs[i] - lows[i];
                let hc = (highs[i] - closes[i - 1]).abs();
                let lc = (lows[i] - closes[i - 1]).abs();
                hl.max(hc).max(lc)
            }
        })
        .collect();

    let mut avg_atr = tr[0..n].iter().sum::<f64>() / n as f64;
    out[n - 1] = Some(avg_atr);
    for i in n..len {
        avg_atr = (avg_atr * (n as f64 - 1.0) + tr[i]) / n as f64;
        out[i] = Some(avg_atr);
    }

    out
}

/// Cumulative VWAP, resetting at the first bar of each new market-local day.
pub fn vwap(candles: &[Candle], typical: &[f64], volumes: &[f64]) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    let mut current_day = None;

    for i in 0..candles.len() {
        let day = DateTime::<Utc>::from_timestamp(candles[i].timestamp, 0)
            .map(|dt| dt.date_naive());
        if day != current_day {
            cum_pv = 0.0;
            cum_vol = 0.0;
            current_day = day;
        }

        if volumes[i] > 0.0 {
            cum_pv += typical[i] * volumes[i];
            cum_vol += volumes[i];
        }

        out[i] = if cum_vol > 0.0 {
            Some(cum_pv / cum_vol)
        } else {
            None
        };
    }

    out
}
