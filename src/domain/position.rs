//! Position state for the single-position simulator and the trade records
//! it emits.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: Side,
    /// Fill price after slippage.
    pub entry_price: f64,
    pub entry_time: i64,
    pub quantity: f64,
    pub entry_fee: f64,
    pub entry_slippage: f64,
}

impl OpenPosition {
    /// Leveraged P&L at `price`, before exit costs.
    pub fn unrealized_pnl(&self, price: f64, leverage: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) * self.quantity * leverage
    }

    /// Leveraged P&L at `price` as a percent of the entry price.
    pub fn unrealized_percent(&self, price: f64, leverage: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) / self.entry_price * 100.0 * leverage
    }

    pub fn margin(&self) -> f64 {
        self.quantity * self.entry_price
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open(_))
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Open(pos) => Some(pos),
            PositionState::Flat => None,
        }
    }

    /// Move to Flat and hand back the position that was open, if any.
    pub fn take(&mut self) -> Option<OpenPosition> {
        match std::mem::take(self) {
            PositionState::Open(pos) => Some(pos),
            PositionState::Flat => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Signal,
    EndOfPeriod,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Signal => "signal",
            ExitReason::EndOfPeriod => "end_of_period",
        };
        f.write_str(name)
    }
}

/// A closed round trip. Created at exit, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub side: Side,
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub exit_reason: ExitReason,
    /// Net of both fees; slippage is already in the fill prices.
    pub profit: f64,
    /// Profit relative to the margin committed at entry.
    pub profit_percent: f64,
    pub entry_fee: f64,
    pub exit_fee: f64,
    /// Value lost to slippage on both fills, informational.
    pub slippage_cost: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }

    pub fn duration_ms(&self) -> i64 {
        self.exit_time - self.entry_time
    }

    pub fn fees(&self) -> f64 {
        self.entry_fee + self.exit_fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position(side: Side) -> OpenPosition {
        OpenPosition {
            side,
            entry_price: 100.0,
            entry_time: 0,
            quantity: 10.0,
            entry_fee: 1.0,
            entry_slippage: 0.0,
        }
    }

    #[test]
    fn long_unrealized() {
        let pos = sample_position(Side::Long);
        assert!((pos.unrealized_pnl(110.0, 1.0) - 100.0).abs() < 1e-10);
        assert!((pos.unrealized_percent(110.0, 1.0) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn short_unrealized() {
        let pos = sample_position(Side::Short);
        assert!((pos.unrealized_pnl(90.0, 1.0) - 100.0).abs() < 1e-10);
        assert!((pos.unrealized_percent(110.0, 1.0) + 10.0).abs() < 1e-10);
    }

    #[test]
    fn leverage_scales_percent_not_quantity() {
        let pos = sample_position(Side::Long);
        assert!((pos.unrealized_percent(101.0, 5.0) - 5.0).abs() < 1e-10);
        assert!((pos.margin() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn take_resets_to_flat() {
        let mut state = PositionState::Open(sample_position(Side::Long));
        assert!(state.is_open());
        let pos = state.take().unwrap();
        assert_eq!(pos.side, Side::Long);
        assert!(!state.is_open());
        assert!(state.take().is_none());
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::StopLoss.to_string(), "stop_loss");
        assert_eq!(ExitReason::EndOfPeriod.to_string(), "end_of_period");
    }

    #[test]
    fn side_display() {
        assert_eq!(Side::Long.to_string(), "long");
        assert_eq!(Side::Short.to_string(), "short");
    }
}
