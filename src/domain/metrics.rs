//! Performance metrics reduced from a trade ledger and equity curve.

use super::backtest::EquityPoint;
use super::position::Trade;

/// Reported profit factor when there are winners but no losers.
pub const PROFIT_FACTOR_CAP: f64 = 999.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_balance: f64,
    pub final_balance: f64,
    /// Percent.
    pub total_return: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades with `profit > 0`.
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Percent of the running peak.
    pub max_drawdown: f64,
    /// Longest run of candles spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub avg_win: f64,
    /// Mean loser profit, so zero or negative.
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_trade_duration_ms: f64,
    pub total_fees: f64,
}

impl Metrics {
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        initial_balance: f64,
        final_balance: f64,
    ) -> Self {
        let total_return = if initial_balance > 0.0 {
            (final_balance - initial_balance) / initial_balance * 100.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve, initial_balance);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_ms = 0i64;
        let mut total_fees = 0.0_f64;

        for trade in trades {
            let profit = trade.profit;
            if profit > 0.0 {
                winning_trades += 1;
                total_wins += profit;
                largest_win = largest_win.max(profit);
            } else if profit < 0.0 {
                losing_trades += 1;
                total_losses += profit;
                largest_loss = largest_loss.min(profit);
            }
            total_duration_ms += trade.duration_ms();
            total_fees += trade.fees();
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses < 0.0 {
            (total_wins / total_losses.abs()).min(PROFIT_FACTOR_CAP)
        } else if total_wins > 0.0 {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        };

        let avg_win = if winning_trades > 0 {
            total_wins / winning_trades as f64
        } else {
            0.0
        };

        let avg_loss = if losing_trades > 0 {
            total_losses / losing_trades as f64
        } else {
            0.0
        };

        let avg_trade_duration_ms = if total_trades > 0 {
            total_duration_ms as f64 / total_trades as f64
        } else {
            0.0
        };

        Metrics {
            initial_balance,
            final_balance,
            total_return,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            profit_factor,
            max_drawdown,
            max_drawdown_duration,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_trade_duration_ms,
            total_fees,
        }
    }
}

/// One forward pass with a running peak seeded at the starting balance.
fn compute_drawdown(equity_curve: &[EquityPoint], initial_balance: f64) -> (f64, usize) {
    let mut peak = initial_balance;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.balance >= peak {
            peak = point.balance;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.balance) / peak * 100.0;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}
