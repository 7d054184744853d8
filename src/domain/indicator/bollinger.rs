//! Bollinger Bands indicator.
//!
//! Middle = SMA(n), Upper = Middle + k*STDDEV(n), Lower = Middle - k*STDDEV(n).
//! The multiplier is carried as hundredths so the indicator identity stays hashable.
//! Warmup: first (n-1) values are undefined.

use crate::domain::indicator::stddev::window_mean_stddev;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn calculate_bollinger(prices: &[f64], period: usize, stddev_mult_x100: u32) -> BollingerBands {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let mut bands = BollingerBands {
        upper: Vec::with_capacity(prices.len()),
        middle: Vec::with_capacity(prices.len()),
        lower: Vec::with_capacity(prices.len()),
    };

    for i in 0..prices.len() {
        match window_mean_stddev(prices, i, period) {
            Some((mean, sd)) => {
                bands.upper.push(Some(mean + mult * sd));
                bands.middle.push(Some(mean));
                bands.lower.push(Some(mean - mult * sd));
            }
            None => {
                bands.upper.push(None);
                bands.middle.push(None);
                bands.lower.push(None);
            }
        }
    }

    bands
}

/// Where `price` sits inside `[lower, upper]`, clamped to [0, 1].
///
/// A zero-width band reports the midpoint.
pub fn band_position(price: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    if width.abs() < f64::EPSILON {
        return 0.5;
    }
    ((price - lower) / width).clamp(0.0, 1.0)
}
