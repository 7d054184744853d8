//! Rate of Change indicator.
//!
//! ROC(n)[i] = (P[i] - P[i-n]) / P[i-n] * 100
//! Warmup: first n values are undefined. A zero base price yields undefined.

pub fn calculate_roc(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| {
            if period == 0 || i < period {
                return None;
            }
            let base = prices[i - period];
            if base == 0.0 {
                None
            } else {
                Some((price - base) / base * 100.0)
            }
        })
        .collect()
}
