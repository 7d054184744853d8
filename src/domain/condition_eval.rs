//! Condition evaluation.
//!
//! Turns a `ConditionGroup` into one boolean per candle.
//!
//! # Evaluation Semantics
//!
//! - An undefined value on either side makes the condition false at that index
//! - `CROSSES_ABOVE`/`CROSSES_BELOW`: need both `i-1` and `i`, so index 0 is always false
//! - A group is a disjunction if any member is `OR`, otherwise a conjunction
//! - An empty group never fires

use crate::domain::condition::{Comparison, Condition, ConditionGroup, Operand};
use crate::domain::indicator::IndicatorKind;
use crate::domain::indicator::cache::IndicatorCache;

const EPSILON: f64 = 1e-9;

fn series_value(cache: &IndicatorCache, kind: IndicatorKind, index: usize) -> Option<f64> {
    cache.series(kind)?.get(index)
}

fn operand_value(cache: &IndicatorCache, operand: &Operand, index: usize) -> Option<f64> {
    match operand {
        Operand::Value(v) => Some(*v),
        Operand::Indicator(kind) => series_value(cache, *kind, index),
    }
}

fn pair_at(
    cache: &IndicatorCache,
    left: IndicatorKind,
    right: &Operand,
    index: usize,
) -> Option<(f64, f64)> {
    Some((
        series_value(cache, left, index)?,
        operand_value(cache, right, index)?,
    ))
}

/// Evaluate one condition at `index`. Every referenced indicator must already
/// be in the cache; a missing series reads as undefined.
pub fn evaluate_condition(condition: &Condition, cache: &IndicatorCache, index: usize) -> bool {
    let left = condition.indicator;
    match &condition.comparison {
        Comparison::GreaterThan(right) => {
            pair_at(cache, left, right, index).is_some_and(|(l, r)| l > r)
        }
        Comparison::LessThan(right) => {
            pair_at(cache, left, right, index).is_some_and(|(l, r)| l < r)
        }
        Comparison::Equals(right) => {
            pair_at(cache, left, right, index).is_some_and(|(l, r)| (l - r).abs() < EPSILON)
        }
        Comparison::CrossesAbove(right) => {
            if index == 0 {
                return false;
            }
            match (
                pair_at(cache, left, right, index - 1),
                pair_at(cache, left, right, index),
            ) {
                (Some((lp, rp)), Some((lc, rc))) => lp <= rp && lc > rc,
                _ => false,
            }
        }
        Comparison::CrossesBelow(right) => {
            if index == 0 {
                return false;
            }
            match (
                pair_at(cache, left, right, index - 1),
                pair_at(cache, left, right, index),
            ) {
                (Some((lp, rp)), Some((lc, rc))) => lp >= rp && lc < rc,
                _ => false,
            }
        }
        Comparison::InRange { low, high } => series_value(cache, left, index)
            .is_some_and(|v| v >= *low && v <= *high),
        Comparison::OutOfRange { low, high } => {
            series_value(cache, left, index).is_some_and(|v| v < *low || v > *high)
        }
    }
}

/// Evaluate a group over every candle in the cache's series.
pub fn evaluate_group(group: &ConditionGroup, cache: &mut IndicatorCache) -> Vec<bool> {
    let len = cache.candles().len();
    if group.is_empty() {
        return vec![false; len];
    }

    for kind in group.indicators() {
        cache.ensure(kind);
    }
    let cache = &*cache;

    let disjunction = group.is_disjunction();
    (0..len)
        .map(|i| {
            if disjunction {
                group
                    .conditions
                    .iter()
                    .any(|c| evaluate_condition(c, cache, i))
            } else {
                group
                    .conditions
                    .iter()
                    .all(|c| evaluate_condition(c, cache, i))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::condition::{LogicalOperator, OrderType};
    use crate::domain::condition_parser::{parse_condition, parse_group};

    fn make_candles(prices: &[f64]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                open_time: i as i64 * 60_000,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn eval(prices: &[f64], lines: &[&str]) -> Vec<bool> {
        let candles = make_candles(prices);
        let mut cache = IndicatorCache::new(&candles);
        let group = parse_group(lines.iter().copied(), OrderType::Entry).unwrap();
        evaluate_group(&group, &mut cache)
    }

    #[test]
    fn greater_than_threshold() {
        let result = eval(&[99.0, 100.0, 101.0], &["CLOSE > 100"]);
        assert_eq!(result, vec![false, false, true]);
    }

    #[test]
    fn less_than_threshold() {
        let result = eval(&[99.0, 100.0, 101.0], &["CLOSE < 100"]);
        assert_eq!(result, vec![true, false, false]);
    }

    #[test]
    fn equals_uses_epsilon() {
        let result = eval(&[100.0, 100.0 + 1e-12, 100.1], &["CLOSE == 100"]);
        assert_eq!(result, vec![true, true, false]);
    }

    #[test]
    fn warmup_values_never_fire() {
        // SMA(3) < 1000 holds numerically but is undefined for the first two bars
        let result = eval(&[1.0, 2.0, 3.0, 4.0], &["SMA(3) < 1000"]);
        assert_eq!(result, vec![false, false, true, true]);
    }

    #[test]
    fn crosses_above_threshold() {
        let result = eval(&[98.0, 99.0, 101.0, 102.0, 99.0, 103.0], &["CLOSE CROSSES_ABOVE 100"]);
        assert_eq!(result, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn crosses_below_threshold() {
        let result = eval(&[101.0, 99.0, 98.0, 101.0, 97.0], &["CLOSE CROSSES_BELOW 100"]);
        assert_eq!(result, vec![false, true, false, false, true]);
    }

    #[test]
    fn crossover_never_at_index_zero() {
        let result = eval(&[150.0, 150.0], &["CLOSE CROSSES_ABOVE 100"]);
        assert!(!result[0]);
    }

    #[test]
    fn crossover_from_touching() {
        // equal then above counts as a cross
        let result = eval(&[100.0, 101.0], &["CLOSE CROSSES_ABOVE 100"]);
        assert_eq!(result, vec![false, true]);
    }

    #[test]
    fn crossover_between_two_series() {
        let prices = [10.0, 10.0, 10.0, 12.0, 14.0, 16.0];
        let result = eval(&prices, &["SMA(1) CROSSES_ABOVE SMA(3)"]);
        assert_eq!(result, vec![false, false, false, true, false, false]);
    }

    #[test]
    fn crossover_with_undefined_previous_is_false() {
        // SMA(3) first defined at index 2, so index 2 has no defined previous
        let result = eval(&[1.0, 1.0, 5.0, 6.0], &["CLOSE CROSSES_ABOVE SMA(3)"]);
        assert!(!result[2]);
    }

    #[test]
    fn in_range_and_out_of_range() {
        let prices = [5.0, 10.0, 15.0, 20.0];
        assert_eq!(
            eval(&prices, &["CLOSE IN_RANGE 10 15"]),
            vec![false, true, true, false]
        );
        assert_eq!(
            eval(&prices, &["CLOSE OUT_OF_RANGE 10 15"]),
            vec![true, false, false, true]
        );
    }

    #[test]
    fn group_conjunction() {
        let result = eval(&[5.0, 10.0, 15.0, 20.0], &["CLOSE > 6", "CLOSE < 18"]);
        assert_eq!(result, vec![false, true, true, false]);
    }

    #[test]
    fn group_any_or_makes_disjunction() {
        let result = eval(&[5.0, 10.0, 15.0, 20.0], &["CLOSE < 6", "OR CLOSE > 18"]);
        assert_eq!(result, vec![true, false, false, true]);
    }

    #[test]
    fn empty_group_never_fires() {
        let candles = make_candles(&[1.0, 2.0]);
        let mut cache = IndicatorCache::new(&candles);
        let result = evaluate_group(&ConditionGroup::default(), &mut cache);
        assert_eq!(result, vec![false, false]);
    }

    #[test]
    fn evaluate_condition_without_cached_series_is_false() {
        let candles = make_candles(&[1.0, 2.0]);
        let cache = IndicatorCache::new(&candles);
        let condition = parse_condition("SMA(1) > 0", OrderType::Entry).unwrap();
        assert_eq!(condition.logical, LogicalOperator::And);
        assert!(!evaluate_condition(&condition, &cache, 1));
    }

    #[test]
    fn crossovers_are_mutually_exclusive() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.4).sin() * 5.0).collect();
        let above = eval(&prices, &["SMA(2) CROSSES_ABOVE SMA(5)"]);
        let below = eval(&prices, &["SMA(2) CROSSES_BELOW SMA(5)"]);
        assert!(above.iter().zip(&below).all(|(a, b)| !(*a && *b)));
        assert!(above.iter().any(|&a| a));
        assert!(below.iter().any(|&b| b));
    }
}
