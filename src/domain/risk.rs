//! Risk and cost configuration for one simulation run.

use crate::domain::error::StratsimError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionTiming {
    /// Aggressive fills, always charged the taker fee.
    #[default]
    Taker,
    /// Passive fills; protective and forced exits still cross the spread.
    Maker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductType {
    #[default]
    Spot,
    Swap,
}

impl ProductType {
    pub fn allows_short(self) -> bool {
        matches!(self, ProductType::Swap)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub initial_balance: f64,
    /// 0 disables the stop.
    pub stop_loss_percent: f64,
    /// 0 disables the target.
    pub take_profit_percent: f64,
    pub position_size_percent: f64,
    pub leverage: f64,
    pub maker_fee_percent: f64,
    pub taker_fee_percent: f64,
    pub slippage_percent: f64,
    pub execution_timing: ExecutionTiming,
    pub product_type: ProductType,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            initial_balance: 10_000.0,
            stop_loss_percent: 0.0,
            take_profit_percent: 0.0,
            position_size_percent: 100.0,
            leverage: 1.0,
            maker_fee_percent: 0.0,
            taker_fee_percent: 0.0,
            slippage_percent: 0.0,
            execution_timing: ExecutionTiming::Taker,
            product_type: ProductType::Spot,
        }
    }
}

fn reject(field: &'static str, reason: impl Into<String>) -> StratsimError {
    StratsimError::InvalidRiskConfig {
        field,
        reason: reason.into(),
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), StratsimError> {
    if !value.is_finite() || value < 0.0 {
        return Err(reject(field, format!("must be non-negative, got {}", value)));
    }
    Ok(())
}

impl RiskConfig {
    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<(), StratsimError> {
        if !self.initial_balance.is_finite() || self.initial_balance <= 0.0 {
            return Err(reject(
                "initial_balance",
                format!("must be positive, got {}", self.initial_balance),
            ));
        }
        non_negative("stop_loss_percent", self.stop_loss_percent)?;
        non_negative("take_profit_percent", self.take_profit_percent)?;

        let size = self.position_size_percent;
        if !size.is_finite() || size <= 0.0 || size > 100.0 {
            return Err(reject(
                "position_size_percent",
                format!("must be in (0, 100], got {}", size),
            ));
        }

        if !self.leverage.is_finite() || self.leverage < 1.0 {
            return Err(reject(
                "leverage",
                format!("must be at least 1, got {}", self.leverage),
            ));
        }
        if self.product_type == ProductType::Spot && self.leverage != 1.0 {
            return Err(reject("leverage", "spot products cannot use leverage"));
        }

        non_negative("maker_fee_percent", self.maker_fee_percent)?;
        non_negative("taker_fee_percent", self.taker_fee_percent)?;
        non_negative("slippage_percent", self.slippage_percent)?;
        if self.slippage_percent >= 100.0 {
            return Err(reject("slippage_percent", "must be below 100"));
        }
        Ok(())
    }

    pub fn stop_loss_enabled(&self) -> bool {
        self.stop_loss_percent > 0.0
    }

    pub fn take_profit_enabled(&self) -> bool {
        self.take_profit_percent > 0.0
    }
}

impl FromStr for ExecutionTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "taker" => Ok(ExecutionTiming::Taker),
            "maker" => Ok(ExecutionTiming::Maker),
            other => Err(format!("expected 'taker' or 'maker', got '{}'", other)),
        }
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spot" => Ok(ProductType::Spot),
            "swap" => Ok(ProductType::Swap),
            other => Err(format!("expected 'spot' or 'swap', got '{}'", other)),
        }
    }
}

impl fmt::Display for ExecutionTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTiming::Taker => f.write_str("taker"),
            ExecutionTiming::Maker => f.write_str("maker"),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductType::Spot => f.write_str("spot"),
            ProductType::Swap => f.write_str("swap"),
        }
    }
}
