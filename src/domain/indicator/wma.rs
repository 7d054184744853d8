//! Weighted Moving Average indicator.
//!
//! O(n) sliding window: the weighted sum drops the whole window sum and adds
//! n times the new price on each step.
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) values are undefined.

pub fn calculate_wma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(prices.len());
    if period == 0 {
        values.resize(prices.len(), None);
        return values;
    }

    let divisor = (period * (period + 1)) as f64 / 2.0;
    let mut weighted_sum: f64 = 0.0;
    let mut window_sum: f64 = 0.0;

    for (i, &price) in prices.iter().enumerate() {
        if i < period {
            weighted_sum += (i + 1) as f64 * price;
            window_sum += price;
        } else {
            weighted_sum += period as f64 * price - window_sum;
            window_sum += price - prices[i - period];
        }

        values.push(if i + 1 >= period {
            Some(weighted_sum / divisor)
        } else {
            None
        });
    }

    values
}
