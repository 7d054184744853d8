//! Fill pricing and fee selection.
//!
//! Slippage always moves the fill against the trader: buys fill above the
//! close, sells below it.

use crate::domain::position::{ExitReason, Side};
use crate::domain::risk::{ExecutionTiming, RiskConfig};

/// Opening fill. Long buys, short sells.
pub fn entry_fill_price(close: f64, side: Side, slippage_pct: f64) -> f64 {
    match side {
        Side::Long => close * (1.0 + slippage_pct / 100.0),
        Side::Short => close * (1.0 - slippage_pct / 100.0),
    }
}

/// Closing fill. Long sells, short buys to cover.
pub fn exit_fill_price(close: f64, side: Side, slippage_pct: f64) -> f64 {
    match side {
        Side::Long => close * (1.0 - slippage_pct / 100.0),
        Side::Short => close * (1.0 + slippage_pct / 100.0),
    }
}

pub fn fee(notional: f64, fee_pct: f64) -> f64 {
    notional.abs() * fee_pct / 100.0
}

/// Fee rate for an entry (`exit == None`) or an exit with the given reason.
///
/// Stop-loss and end-of-period exits are forced and pay taker even under
/// maker timing.
pub fn fee_percent(risk: &RiskConfig, exit: Option<ExitReason>) -> f64 {
    match risk.execution_timing {
        ExecutionTiming::Taker => risk.taker_fee_percent,
        ExecutionTiming::Maker => match exit {
            Some(ExitReason::StopLoss) | Some(ExitReason::EndOfPeriod) => risk.taker_fee_percent,
            None | Some(ExitReason::Signal) | Some(ExitReason::TakeProfit) => {
                risk.maker_fee_percent
            }
        },
    }
}

/// Quantity bought with `position_size_percent` of `balance` at `fill_price`.
/// `None` when the result would not be a positive finite size.
pub fn position_quantity(balance: f64, position_size_pct: f64, fill_price: f64) -> Option<f64> {
    if balance <= 0.0 || fill_price <= 0.0 {
        return None;
    }
    let quantity = balance * position_size_pct / 100.0 / fill_price;
    (quantity.is_finite() && quantity > 0.0).then_some(quantity)
}
