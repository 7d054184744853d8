//! Multi-factor composite scorer.
//!
//! Blends momentum, trend, volatility and relative strength (each on
//! [-100, 100]) into a raw score, smooths it with a short EMA and derives
//! long/short entry and exit series from fixed thresholds.
//!
//! The trend factor is normalized by its running min/max, so the same bar can
//! score differently when the history starts at a different candle. Results
//! are reproducible for a given input series but are not stationary across
//! windows.

use crate::domain::candle::{Candle, closes};
use crate::domain::error::StratsimError;
use crate::domain::indicator::ema::ema_of_defined;
use crate::domain::indicator::factors;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeWeights {
    pub momentum: f64,
    pub trend: f64,
    pub volatility: f64,
    pub relative_strength: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            momentum: 0.25,
            trend: 0.35,
            volatility: 0.20,
            relative_strength: 0.20,
        }
    }
}

impl CompositeWeights {
    pub fn total(&self) -> f64 {
        self.momentum + self.trend + self.volatility + self.relative_strength
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeConfig {
    pub weights: CompositeWeights,
    pub smoothing_period: usize,
    pub long_threshold: f64,
    pub exit_threshold: f64,
    pub short_threshold: f64,
    pub rsi_period: usize,
    pub trend_fast_period: usize,
    pub trend_slow_period: usize,
    pub band_period: usize,
    pub band_stddev_mult_x100: u32,
    pub roc_period: usize,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            weights: CompositeWeights::default(),
            smoothing_period: 5,
            long_threshold: 30.0,
            exit_threshold: 0.0,
            short_threshold: -30.0,
            rsi_period: 14,
            trend_fast_period: 12,
            trend_slow_period: 26,
            band_period: 20,
            band_stddev_mult_x100: 200,
            roc_period: 10,
        }
    }
}

fn invalid(key: &str, reason: &str) -> StratsimError {
    StratsimError::ConfigInvalid {
        section: "composite".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl CompositeConfig {
    pub fn validate(&self) -> Result<(), StratsimError> {
        let w = &self.weights;
        for (key, value) in [
            ("momentum_weight", w.momentum),
            ("trend_weight", w.trend),
            ("volatility_weight", w.volatility),
            ("relative_strength_weight", w.relative_strength),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, "must be a non-negative number"));
            }
        }
        if w.total() <= 0.0 {
            return Err(invalid("weights", "at least one weight must be positive"));
        }

        for (key, period) in [
            ("smoothing_period", self.smoothing_period),
            ("rsi_period", self.rsi_period),
            ("trend_fast_period", self.trend_fast_period),
            ("trend_slow_period", self.trend_slow_period),
            ("band_period", self.band_period),
            ("roc_period", self.roc_period),
        ] {
            if period == 0 {
                return Err(invalid(key, "must be at least 1"));
            }
        }
        if self.trend_fast_period >= self.trend_slow_period {
            return Err(invalid(
                "trend_fast_period",
                "must be shorter than trend_slow_period",
            ));
        }

        if self.short_threshold > self.exit_threshold || self.exit_threshold > self.long_threshold {
            return Err(invalid(
                "thresholds",
                "expected short_threshold <= exit_threshold <= long_threshold",
            ));
        }
        Ok(())
    }

    /// Leading candles with no smoothed score.
    pub fn warmup(&self) -> usize {
        let factor_warmup = self
            .rsi_period
            .max(self.trend_slow_period.saturating_sub(1))
            .max(self.band_period.saturating_sub(1))
            .max(self.roc_period);
        factor_warmup + self.smoothing_period.saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub raw: Vec<Option<f64>>,
    pub smoothed: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSignals {
    pub long_entry: Vec<bool>,
    pub long_exit: Vec<bool>,
    pub short_entry: Vec<bool>,
    pub short_exit: Vec<bool>,
}

/// Weighted blend of the four factors, undefined where any factor is.
pub fn score(candles: &[Candle], config: &CompositeConfig) -> CompositeScore {
    let prices = closes(candles);
    let momentum = factors::momentum(&prices, config.rsi_period);
    let trend = factors::trend(&prices, config.trend_fast_period, config.trend_slow_period);
    let volatility = factors::volatility(&prices, config.band_period, config.band_stddev_mult_x100);
    let strength = factors::relative_strength(&prices, config.roc_period);

    let w = &config.weights;
    let total = w.total();
    let raw: Vec<Option<f64>> = (0..prices.len())
        .map(|i| {
            let blended = w.momentum * momentum[i]?
                + w.trend * trend[i]?
                + w.volatility * volatility[i]?
                + w.relative_strength * strength[i]?;
            Some(blended / total)
        })
        .collect();

    let smoothed = ema_of_defined(&raw, config.smoothing_period);
    CompositeScore { raw, smoothed }
}

pub fn signals(score: &CompositeScore, config: &CompositeConfig) -> CompositeSignals {
    let fire = |pred: &dyn Fn(f64) -> bool| -> Vec<bool> {
        score
            .smoothed
            .iter()
            .map(|s| s.is_some_and(|v| pred(v)))
            .collect()
    };

    CompositeSignals {
        long_entry: fire(&|v| v > config.long_threshold),
        long_exit: fire(&|v| v < config.exit_threshold),
        short_entry: fire(&|v| v < config.short_threshold),
        short_exit: fire(&|v| v > config.exit_threshold),
    }
}
