//! Strategy definition and signal generation.
//!
//! A strategy turns a candle series into four aligned boolean series (long
//! entry/exit, short entry/exit), either from condition groups or from the
//! composite scorer.

use crate::domain::candle::Candle;
use crate::domain::composite::{self, CompositeConfig};
use crate::domain::condition::ConditionGroup;
use crate::domain::condition_eval::evaluate_group;
use crate::domain::error::StratsimError;
use crate::domain::indicator::cache::IndicatorCache;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionRules {
    pub entry_long: ConditionGroup,
    pub exit_long: ConditionGroup,
    pub entry_short: ConditionGroup,
    pub exit_short: ConditionGroup,
}

impl ConditionRules {
    fn groups(&self) -> [&ConditionGroup; 4] {
        [
            &self.entry_long,
            &self.exit_long,
            &self.entry_short,
            &self.exit_short,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalMode {
    Conditions(ConditionRules),
    Composite(CompositeConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub mode: SignalMode,
}

/// Per-candle signals, each the same length as the candle series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSeries {
    pub long_entry: Vec<bool>,
    pub long_exit: Vec<bool>,
    pub short_entry: Vec<bool>,
    pub short_exit: Vec<bool>,
}

impl SignalSeries {
    /// All-false series of length `len`.
    pub fn quiet(len: usize) -> Self {
        SignalSeries {
            long_entry: vec![false; len],
            long_exit: vec![false; len],
            short_entry: vec![false; len],
            short_exit: vec![false; len],
        }
    }

    /// Length shared by all four series, `None` if they disagree.
    pub fn aligned_len(&self) -> Option<usize> {
        let len = self.long_entry.len();
        (self.long_exit.len() == len && self.short_entry.len() == len && self.short_exit.len() == len)
            .then_some(len)
    }
}

impl Strategy {
    pub fn validate(&self) -> Result<(), StratsimError> {
        match &self.mode {
            SignalMode::Composite(config) => config.validate(),
            SignalMode::Conditions(rules) => {
                if rules.entry_long.is_empty() && rules.entry_short.is_empty() {
                    return Err(StratsimError::RuleInvalid {
                        reason: format!("strategy '{}' has no entry conditions", self.name),
                    });
                }
                for condition in rules.groups().iter().flat_map(|g| &g.conditions) {
                    for kind in condition.indicators() {
                        kind.validate()?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Leading candles before any signal can fire.
    pub fn warmup(&self) -> usize {
        match &self.mode {
            SignalMode::Composite(config) => config.warmup(),
            SignalMode::Conditions(rules) => rules
                .groups()
                .iter()
                .map(|g| g.warmup())
                .max()
                .unwrap_or(0),
        }
    }

    pub fn has_short_rules(&self) -> bool {
        match &self.mode {
            SignalMode::Composite(_) => true,
            SignalMode::Conditions(rules) => !rules.entry_short.is_empty(),
        }
    }

    pub fn generate_signals(&self, candles: &[Candle]) -> SignalSeries {
        match &self.mode {
            SignalMode::Conditions(rules) => {
                let mut cache = IndicatorCache::new(candles);
                let signals = SignalSeries {
                    long_entry: evaluate_group(&rules.entry_long, &mut cache),
                    long_exit: evaluate_group(&rules.exit_long, &mut cache),
                    short_entry: evaluate_group(&rules.entry_short, &mut cache),
                    short_exit: evaluate_group(&rules.exit_short, &mut cache),
                };
                tracing::debug!(
                    strategy = %self.name,
                    series = %cache.series_id(),
                    indicators = cache.len(),
                    "evaluated condition groups"
                );
                signals
            }
            SignalMode::Composite(config) => {
                let score = composite::score(candles, config);
                let s = composite::signals(&score, config);
                SignalSeries {
                    long_entry: s.long_entry,
                    long_exit: s.long_exit,
                    short_entry: s.short_entry,
                    short_exit: s.short_exit,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::OrderType;
    use crate::domain::condition_parser::parse_group;

    fn make_candles(prices: &[f64]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                open_time: i as i64 * 60_000,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    fn sma_cross_strategy() -> Strategy {
        let rules = ConditionRules {
            entry_long: parse_group(["SMA(2) CROSSES_ABOVE SMA(4)"], OrderType::Entry).unwrap(),
            exit_long: parse_group(["SMA(2) CROSSES_BELOW SMA(4)"], OrderType::Exit).unwrap(),
            ..ConditionRules::default()
        };
        Strategy {
            name: "SMA Crossover".into(),
            description: "fast over slow".into(),
            mode: SignalMode::Conditions(rules),
        }
    }

    #[test]
    fn condition_strategy_fields() {
        let s = sma_cross_strategy();
        assert_eq!(s.name, "SMA Crossover");
        assert!(s.validate().is_ok());
        assert!(!s.has_short_rules());
        assert_eq!(s.warmup(), 4);
    }

    #[test]
    fn strategy_without_entries_is_invalid() {
        let s = Strategy {
            name: "empty".into(),
            description: String::new(),
            mode: SignalMode::Conditions(ConditionRules::default()),
        };
        assert!(matches!(s.validate(), Err(StratsimError::RuleInvalid { .. })));
    }

    #[test]
    fn generated_signals_are_aligned() {
        let candles = make_candles(&[10.0, 9.0, 8.0, 9.0, 12.0, 14.0, 11.0, 8.0, 7.0]);
        let signals = sma_cross_strategy().generate_signals(&candles);
        assert_eq!(signals.aligned_len(), Some(candles.len()));
        assert!(signals.long_entry.iter().any(|&b| b));
        assert!(signals.short_entry.iter().all(|&b| !b));
    }

    #[test]
    fn composite_strategy_signals() {
        let s = Strategy {
            name: "regime".into(),
            description: String::new(),
            mode: SignalMode::Composite(CompositeConfig::default()),
        };
        assert!(s.validate().is_ok());
        assert!(s.has_short_rules());
        assert_eq!(s.warmup(), CompositeConfig::default().warmup());
        let candles = make_candles(&[100.0; 50]);
        assert_eq!(s.generate_signals(&candles).aligned_len(), Some(50));
    }

    #[test]
    fn quiet_series_never_fires() {
        let quiet = SignalSeries::quiet(3);
        assert_eq!(quiet.aligned_len(), Some(3));
        assert!(quiet.long_entry.iter().all(|&b| !b));
    }

    #[test]
    fn misaligned_series_detected() {
        let mut s = SignalSeries::quiet(3);
        s.short_exit.pop();
        assert_eq!(s.aligned_len(), None);
    }
}
