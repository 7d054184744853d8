//! Standard Deviation indicator.
//!
//! Population standard deviation over n prices.
//! STDDEV(n)[i] = sqrt(sum((P[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) values are undefined.

pub fn calculate_stddev(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| window_mean_stddev(prices, i, period).map(|(_, sd)| sd))
        .collect()
}

/// Mean and population standard deviation of the window ending at `index`.
pub(crate) fn window_mean_stddev(prices: &[f64], index: usize, period: usize) -> Option<(f64, f64)> {
    if period == 0 || index + 1 < period || index >= prices.len() {
        return None;
    }
    let window = &prices[index + 1 - period..=index];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window
        .iter()
        .map(|p| {
            let diff = p - mean;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;
    Some((mean, variance.sqrt()))
}
