//! Moving Average Convergence Divergence indicator.
//!
//! Line = EMA(fast) - EMA(slow), Signal = EMA(signal) of the line,
//! Histogram = Line - Signal.
//! Warmup: line is undefined for (slow-1) values; signal and histogram for
//! a further (signal-1).

use crate::domain::indicator::ema::{calculate_ema, ema_of_defined};

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = calculate_ema(prices, fast);
    let slow_ema = calculate_ema(prices, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal_line = ema_of_defined(&line, signal);

    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect();

    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}
