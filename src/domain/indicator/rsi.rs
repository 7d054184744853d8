//! Relative Strength Index indicator.
//!
//! Uses simple rolling means of gains and losses over the last n price changes:
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), and 100 when avg_loss is zero.
//! Warmup: first n values are undefined (n changes need n+1 prices).

pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(prices.len());

    for i in 0..prices.len() {
        if period == 0 || i < period {
            values.push(None);
            continue;
        }

        let mut gains = 0.0;
        let mut losses = 0.0;
        for j in (i + 1 - period)..=i {
            let change = prices[j] - prices[j - 1];
            if change > 0.0 {
                gains += change;
            } else {
                losses -= change;
            }
        }

        let avg_gain = gains / period as f64;
        let avg_loss = losses / period as f64;
        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
        values.push(Some(rsi));
    }

    values
}
