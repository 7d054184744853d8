//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), EMA[0] = P[0], then EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! The recurrence runs from the first bar but the first (n-1) values are
//! reported undefined.

pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let inputs: Vec<Option<f64>> = prices.iter().copied().map(Some).collect();
    ema_of_defined(&inputs, period)
}

/// EMA over a partially-defined series.
///
/// The recurrence is seeded at the first defined input and skips undefined
/// positions; output stays undefined until `period` inputs have been seen.
/// Used for the MACD signal line and composite score smoothing.
pub fn ema_of_defined(inputs: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(inputs.len());
    if period == 0 {
        values.resize(inputs.len(), None);
        return values;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema: Option<f64> = None;
    let mut seen = 0usize;

    for input in inputs {
        match *input {
            Some(v) => {
                let next = match ema {
                    None => v,
                    Some(prev) => v * k + prev * (1.0 - k),
                };
                ema = Some(next);
                seen += 1;
                values.push(if seen >= period { ema } else { None });
            }
            None => values.push(None),
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let values = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
        assert!(values[3].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn ema_seeded_at_first_price() {
        // k = 0.5: 10 -> 15 -> 22.5
        let values = calculate_ema(&[10.0, 20.0, 30.0], 3);
        assert!((values[2].unwrap() - 22.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recurrence() {
        let prices = [10.0, 20.0, 30.0, 40.0, 50.0];
        let values = calculate_ema(&prices, 3);
        let k = 0.5;
        let expected = 50.0 * k + values[3].unwrap() * (1.0 - k);
        assert!((values[4].unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn ema_constant_series() {
        let values = calculate_ema(&[42.0; 10], 4);
        for v in values.iter().skip(3) {
            assert!((v.unwrap() - 42.0).abs() < 1e-12);
        }
    }

    #[test]
    fn ema_of_defined_skips_leading_gaps() {
        let inputs = [None, None, Some(10.0), Some(20.0), Some(30.0)];
        let values = ema_of_defined(&inputs, 2);
        assert_eq!(values[0], None);
        assert_eq!(values[2], None);
        // k = 2/3: 10 -> 20*2/3 + 10/3
        let expected = 20.0 * (2.0 / 3.0) + 10.0 / 3.0;
        assert!((values[3].unwrap() - expected).abs() < 1e-10);
        assert!(values[4].is_some());
    }

    #[test]
    fn ema_zero_period_keeps_length() {
        let values = calculate_ema(&[1.0, 2.0], 0);
        assert_eq!(values, vec![None, None]);
    }
}
