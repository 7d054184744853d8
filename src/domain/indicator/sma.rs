//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = sum(P[i-n+1..=i]) / n, maintained as a sliding sum.
//! Warmup: first (n-1) values are undefined.

pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(prices.len());
    if period == 0 {
        values.resize(prices.len(), None);
        return values;
    }

    let mut window_sum = 0.0;
    for (i, &price) in prices.iter().enumerate() {
        window_sum += price;
        if i >= period {
            window_sum -= prices[i - period];
        }

        if i + 1 >= period {
            values.push(Some(window_sum / period as f64));
        } else {
            values.push(None);
        }
    }

    values
}
