//! Normalized factor inputs for the composite scorer.
//!
//! Every factor is mapped onto [-100, 100] and is undefined wherever one of
//! its underlying indicators is still warming up.
//!
//! The trend factor rescales the EMA spread by the running min/max of the
//! spread seen so far. It only reads `[0..=i]`, but the same bar scores
//! differently depending on where the history starts.

use crate::domain::indicator::bollinger::{band_position, calculate_bollinger};
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::roc::calculate_roc;
use crate::domain::indicator::rsi::calculate_rsi;

const FACTOR_BOUND: f64 = 100.0;

/// (RSI - 50) * 2
pub fn momentum(prices: &[f64], rsi_period: usize) -> Vec<Option<f64>> {
    calculate_rsi(prices, rsi_period)
        .into_iter()
        .map(|rsi| rsi.map(|v| ((v - 50.0) * 2.0).clamp(-FACTOR_BOUND, FACTOR_BOUND)))
        .collect()
}

/// EMA spread in percent of the slow EMA.
pub fn ema_spread_percent(prices: &[f64], fast: usize, slow: usize) -> Vec<Option<f64>> {
    let fast_ema = calculate_ema(prices, fast);
    let slow_ema = calculate_ema(prices, slow);
    fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|pair| match pair {
            (Some(f), Some(s)) if *s != 0.0 => Some((f - s) / s * 100.0),
            _ => None,
        })
        .collect()
}

/// EMA spread rescaled by its running min/max; 0 while the range is degenerate.
pub fn trend(prices: &[f64], fast: usize, slow: usize) -> Vec<Option<f64>> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;

    ema_spread_percent(prices, fast, slow)
        .into_iter()
        .map(|spread| {
            let s = spread?;
            lo = lo.min(s);
            hi = hi.max(s);
            let range = hi - lo;
            if range < f64::EPSILON {
                Some(0.0)
            } else {
                Some(((s - lo) / range) * 200.0 - 100.0)
            }
        })
        .collect()
}

/// Band position mapped from [0, 1] onto [-100, 100].
pub fn volatility(prices: &[f64], period: usize, stddev_mult_x100: u32) -> Vec<Option<f64>> {
    let bands = calculate_bollinger(prices, period, stddev_mult_x100);
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| match (bands.lower[i], bands.upper[i]) {
            (Some(lower), Some(upper)) => {
                Some((band_position(price, lower, upper) * 2.0 - 1.0) * 100.0)
            }
            _ => None,
        })
        .collect()
}

/// clamp(ROC% * 10, -100, 100); a proxy for strength against a benchmark.
pub fn relative_strength(prices: &[f64], roc_period: usize) -> Vec<Option<f64>> {
    calculate_roc(prices, roc_period)
        .into_iter()
        .map(|roc| roc.map(|v| (v * 10.0).clamp(-FACTOR_BOUND, FACTOR_BOUND)))
        .collect()
}
