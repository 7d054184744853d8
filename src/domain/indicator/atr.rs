//! Average True Range indicator.
//!
//! TR[0] = high - low; TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR(n) is the simple moving average of TR.
//! Warmup: first (n-1) values are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::sma::calculate_sma;

pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                c.high - c.low
            } else {
                c.true_range(candles[i - 1].close)
            }
        })
        .collect()
}

pub fn calculate_atr(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    calculate_sma(&true_ranges(candles), period)
}
