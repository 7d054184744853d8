//! Technical indicator implementations.
//!
//! This module provides types for representing indicator identity and output:
//! - `IndicatorKind`: closed enum of indicator identity + parameters (serves as cache key)
//! - `IndicatorSeries`: values aligned 1:1 with the candle series
//!
//! Positions inside an indicator's warm-up hold `None` rather than zero so that
//! a half-formed average can never satisfy a comparison. Every function here is
//! index-stable: `values[i]` depends only on `prices[0..=i]`.

pub mod atr;
pub mod bollinger;
pub mod cache;
pub mod ema;
pub mod factors;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod wma;

use crate::domain::candle::{closes, Candle};
use crate::domain::error::StratsimError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    pub fn extract(self, candle: &Candle) -> f64 {
        match self {
            PriceField::Open => candle.open,
            PriceField::High => candle.high,
            PriceField::Low => candle.low,
            PriceField::Close => candle.close,
            PriceField::Volume => candle.volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacdComponent {
    Line,
    Signal,
    Histogram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Price(PriceField),
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Rsi(usize),
    Roc(usize),
    Atr(usize),
    Stddev(usize),
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
        band: Band,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
        component: MacdComponent,
    },
}

impl IndicatorKind {
    /// Number of leading indices that stay undefined.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorKind::Price(_) => 0,
            IndicatorKind::Sma(p)
            | IndicatorKind::Ema(p)
            | IndicatorKind::Wma(p)
            | IndicatorKind::Atr(p)
            | IndicatorKind::Stddev(p)
            | IndicatorKind::Bollinger { period: p, .. } => p.saturating_sub(1),
            IndicatorKind::Rsi(p) | IndicatorKind::Roc(p) => p,
            IndicatorKind::Macd {
                slow,
                signal,
                component,
                ..
            } => match component {
                MacdComponent::Line => slow.saturating_sub(1),
                MacdComponent::Signal | MacdComponent::Histogram => {
                    slow.saturating_sub(1) + signal.saturating_sub(1)
                }
            },
        }
    }

    /// Reject parameter combinations that can never produce a value.
    pub fn validate(&self) -> Result<(), StratsimError> {
        let zero_period = match *self {
            IndicatorKind::Price(_) => false,
            IndicatorKind::Sma(p)
            | IndicatorKind::Ema(p)
            | IndicatorKind::Wma(p)
            | IndicatorKind::Rsi(p)
            | IndicatorKind::Roc(p)
            | IndicatorKind::Atr(p)
            | IndicatorKind::Stddev(p)
            | IndicatorKind::Bollinger { period: p, .. } => p == 0,
            IndicatorKind::Macd {
                fast, slow, signal, ..
            } => {
                if fast >= slow && fast != 0 {
                    return Err(StratsimError::RuleInvalid {
                        reason: format!("{self}: fast period must be shorter than slow period"),
                    });
                }
                fast == 0 || slow == 0 || signal == 0
            }
        };
        if zero_period {
            return Err(StratsimError::RuleInvalid {
                reason: format!("{self}: period must be at least 1"),
            });
        }
        Ok(())
    }

    /// Compute this indicator over a candle series.
    ///
    /// Everything except the raw price fields and ATR is derived from closes.
    pub fn compute(&self, candles: &[Candle]) -> IndicatorSeries {
        let values = match *self {
            IndicatorKind::Price(field) => candles.iter().map(|c| Some(field.extract(c))).collect(),
            IndicatorKind::Atr(p) => atr::calculate_atr(candles, p),
            IndicatorKind::Sma(p) => sma::calculate_sma(&closes(candles), p),
            IndicatorKind::Ema(p) => ema::calculate_ema(&closes(candles), p),
            IndicatorKind::Wma(p) => wma::calculate_wma(&closes(candles), p),
            IndicatorKind::Rsi(p) => rsi::calculate_rsi(&closes(candles), p),
            IndicatorKind::Roc(p) => roc::calculate_roc(&closes(candles), p),
            IndicatorKind::Stddev(p) => stddev::calculate_stddev(&closes(candles), p),
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
                band,
            } => {
                let prices = closes(candles);
                let bands = bollinger::calculate_bollinger(&prices, period, stddev_mult_x100);
                match band {
                    Band::Upper => bands.upper,
                    Band::Middle => bands.middle,
                    Band::Lower => bands.lower,
                }
            }
            IndicatorKind::Macd {
                fast,
                slow,
                signal,
                component,
            } => {
                let macd = macd::calculate_macd(&closes(candles), fast, slow, signal);
                match component {
                    MacdComponent::Line => macd.line,
                    MacdComponent::Signal => macd.signal,
                    MacdComponent::Histogram => macd.histogram,
                }
            }
        };
        IndicatorSeries { kind: *self, values }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, `None` during warm-up or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "OPEN",
            PriceField::High => "HIGH",
            PriceField::Low => "LOW",
            PriceField::Close => "CLOSE",
            PriceField::Volume => "VOLUME",
        };
        f.write_str(name)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Price(field) => write!(f, "{}", field),
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
            IndicatorKind::Wma(period) => write!(f, "WMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Roc(period) => write!(f, "ROC({})", period),
            IndicatorKind::Atr(period) => write!(f, "ATR({})", period),
            IndicatorKind::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
                band,
            } => {
                let name = match band {
                    Band::Upper => "BB_UPPER",
                    Band::Middle => "BB_MIDDLE",
                    Band::Lower => "BB_LOWER",
                };
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "{}({},{})", name, period, mult)
            }
            IndicatorKind::Macd {
                fast,
                slow,
                signal,
                component,
            } => {
                let name = match component {
                    MacdComponent::Line => "MACD",
                    MacdComponent::Signal => "MACD_SIGNAL",
                    MacdComponent::Histogram => "MACD_HIST",
                };
                write!(f, "{}({},{},{})", name, fast, slow, signal)
            }
        }
    }
}
