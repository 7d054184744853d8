//! Backtest engine: one forward pass over the candles.
//!
//! The simulator holds at most one position. On each candle it first checks
//! the open position for an exit (stop-loss, then take-profit, then the exit
//! signal, then end of data), then considers an entry if it was already flat
//! before this candle, and finally marks equity to market.
//!
//! Balance is realized: entry fees leave the balance at entry, and an exit
//! adds the leveraged gross P&L less the exit fee. Final balance therefore
//! equals the starting balance plus the sum of trade profits.

use crate::domain::candle::Candle;
use crate::domain::error::StratsimError;
use crate::domain::execution::{
    entry_fill_price, exit_fill_price, fee, fee_percent, position_quantity,
};
use crate::domain::metrics::Metrics;
use crate::domain::position::{ExitReason, OpenPosition, PositionState, Side, Trade};
use crate::domain::risk::RiskConfig;
use crate::domain::strategy::{SignalSeries, Strategy};
use crate::ports::metrics_port::MetricsSink;
use rayon::prelude::*;

/// Mark-to-market account value at one candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

struct Simulator<'a> {
    risk: &'a RiskConfig,
    sink: &'a dyn MetricsSink,
    balance: f64,
    state: PositionState,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl<'a> Simulator<'a> {
    fn new(risk: &'a RiskConfig, sink: &'a dyn MetricsSink, capacity: usize) -> Self {
        Simulator {
            risk,
            sink,
            balance: risk.initial_balance,
            state: PositionState::Flat,
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(capacity),
        }
    }

    fn exit_reason(
        &self,
        pos: &OpenPosition,
        index: usize,
        candle: &Candle,
        signals: &SignalSeries,
        last: bool,
    ) -> Option<ExitReason> {
        let pct = pos.unrealized_percent(candle.close, self.risk.leverage);
        let exit_signal = match pos.side {
            Side::Long => signals.long_exit[index],
            Side::Short => signals.short_exit[index],
        };

        if self.risk.stop_loss_enabled() && pct <= -self.risk.stop_loss_percent {
            Some(ExitReason::StopLoss)
        } else if self.risk.take_profit_enabled() && pct >= self.risk.take_profit_percent {
            Some(ExitReason::TakeProfit)
        } else if exit_signal {
            Some(ExitReason::Signal)
        } else if last {
            Some(ExitReason::EndOfPeriod)
        } else {
            None
        }
    }

    fn entry_side(&self, index: usize, signals: &SignalSeries) -> Option<Side> {
        if signals.long_entry[index] {
            Some(Side::Long)
        } else if signals.short_entry[index] && self.risk.product_type.allows_short() {
            Some(Side::Short)
        } else {
            None
        }
    }

    fn open(&mut self, side: Side, candle: &Candle, index: usize) {
        let fill = entry_fill_price(candle.close, side, self.risk.slippage_percent);
        let Some(quantity) =
            position_quantity(self.balance, self.risk.position_size_percent, fill)
        else {
            tracing::debug!(index, balance = self.balance, "entry skipped: no size available");
            self.sink.increment("entries_skipped", 1);
            return;
        };

        let entry_fee = fee(quantity * fill, fee_percent(self.risk, None));
        self.balance -= entry_fee;
        self.state = PositionState::Open(OpenPosition {
            side,
            entry_price: fill,
            entry_time: candle.open_time,
            quantity,
            entry_fee,
            entry_slippage: quantity * (fill - candle.close).abs(),
        });

        tracing::debug!(%side, index, price = fill, quantity, fee = entry_fee, "opened position");
        self.sink.increment("positions_opened", 1);
    }

    fn close(&mut self, candle: &Candle, reason: ExitReason) {
        let Some(pos) = self.state.take() else {
            return;
        };

        let leverage = self.risk.leverage;
        let exit_price = exit_fill_price(candle.close, pos.side, self.risk.slippage_percent);
        let gross = pos.unrealized_pnl(exit_price, leverage);
        let exit_fee = fee(pos.quantity * exit_price, fee_percent(self.risk, Some(reason)));
        let profit = gross - pos.entry_fee - exit_fee;
        let margin = pos.margin();
        let profit_percent = if margin > 0.0 {
            profit / margin * 100.0
        } else {
            0.0
        };

        self.balance += gross - exit_fee;

        tracing::debug!(
            side = %pos.side,
            reason = %reason,
            price = exit_price,
            quantity = pos.quantity,
            profit,
            "closed position"
        );
        self.sink.increment("trades_closed", 1);

        self.trades.push(Trade {
            side: pos.side,
            entry_time: pos.entry_time,
            exit_time: candle.open_time,
            entry_price: pos.entry_price,
            exit_price,
            quantity: pos.quantity,
            exit_reason: reason,
            profit,
            profit_percent,
            entry_fee: pos.entry_fee,
            exit_fee,
            slippage_cost: pos.entry_slippage + pos.quantity * (candle.close - exit_price).abs(),
        });
    }

    fn mark(&mut self, candle: &Candle) {
        let unrealized = self
            .state
            .position()
            .map(|pos| pos.unrealized_pnl(candle.close, self.risk.leverage))
            .unwrap_or(0.0);
        self.equity_curve.push(EquityPoint {
            timestamp: candle.open_time,
            balance: self.balance + unrealized,
        });
    }

    fn run(mut self, candles: &[Candle], signals: &SignalSeries) -> BacktestResult {
        for (i, candle) in candles.iter().enumerate() {
            let last = i + 1 == candles.len();

            let exit = self
                .state
                .position()
                .and_then(|pos| self.exit_reason(pos, i, candle, signals, last));
            let was_open = self.state.is_open();
            if let Some(reason) = exit {
                self.close(candle, reason);
            }

            // An exit candle never re-enters, and nothing opens on the final candle.
            if !was_open && !last {
                if let Some(side) = self.entry_side(i, signals) {
                    self.open(side, candle, i);
                }
            }

            self.mark(candle);
        }

        let metrics = Metrics::compute(
            &self.trades,
            &self.equity_curve,
            self.risk.initial_balance,
            self.balance,
        );
        self.sink.increment("backtest_runs", 1);
        self.sink.gauge("final_balance", self.balance);

        BacktestResult {
            trades: self.trades,
            equity_curve: self.equity_curve,
            metrics,
        }
    }
}

/// Simulate trades from precomputed signal series.
pub fn simulate(
    candles: &[Candle],
    signals: &SignalSeries,
    risk: &RiskConfig,
    sink: &dyn MetricsSink,
) -> Result<BacktestResult, StratsimError> {
    if candles.is_empty() {
        return Err(StratsimError::EmptyCandles);
    }
    risk.validate()?;
    if signals.aligned_len() != Some(candles.len()) {
        return Err(StratsimError::Data {
            reason: format!(
                "signal series do not match {} candles",
                candles.len()
            ),
        });
    }

    let result = Simulator::new(risk, sink, candles.len()).run(candles, signals);
    tracing::info!(
        candles = candles.len(),
        trades = result.trades.len(),
        final_balance = result.metrics.final_balance,
        "backtest complete"
    );
    Ok(result)
}

/// Validate inputs, generate signals and simulate.
///
/// Every input error is reported before any simulation starts.
pub fn run_backtest(
    candles: &[Candle],
    strategy: &Strategy,
    risk: &RiskConfig,
    sink: &dyn MetricsSink,
) -> Result<BacktestResult, StratsimError> {
    risk.validate()?;
    strategy.validate()?;
    if candles.is_empty() {
        return Err(StratsimError::EmptyCandles);
    }
    let minimum = strategy.warmup() + 1;
    if candles.len() < minimum {
        return Err(StratsimError::InsufficientData {
            bars: candles.len(),
            minimum,
        });
    }

    let signals = strategy.generate_signals(candles);
    simulate(candles, &signals, risk, sink)
}

/// One independent run in a batch. Each job owns its inputs.
#[derive(Debug, Clone)]
pub struct BacktestJob {
    pub label: String,
    pub candles: Vec<Candle>,
    pub strategy: Strategy,
    pub risk: RiskConfig,
}

/// Run jobs in parallel. Results come back in job order.
pub fn run_batch(
    jobs: &[BacktestJob],
    sink: &dyn MetricsSink,
) -> Vec<Result<BacktestResult, StratsimError>> {
    jobs.par_iter()
        .map(|job| {
            let result = run_backtest(&job.candles, &job.strategy, &job.risk, sink);
            if let Err(e) = &result {
                tracing::warn!(label = %job.label, error = %e, "backtest skipped");
            }
            result
        })
        .collect()
}
