//! CSV report adapter implementing ReportPort.
//!
//! Each run produces three files in the output directory:
//! `<label>_trades.csv`, `<label>_equity.csv` and `<label>_summary.csv`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::candle::format_millis;
use crate::domain::error::StratsimError;
use crate::domain::strategy::{SignalMode, Strategy};
use crate::ports::report_port::ReportPort;

const TRADE_HEADER: [&str; 12] = [
    "side",
    "entry_time",
    "exit_time",
    "entry_price",
    "exit_price",
    "quantity",
    "exit_reason",
    "profit",
    "profit_percent",
    "entry_fee",
    "exit_fee",
    "slippage_cost",
];

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

fn csv_err(e: csv::Error) -> StratsimError {
    StratsimError::Io(std::io::Error::other(e))
}

fn writer(path: &Path) -> Result<csv::Writer<fs::File>, StratsimError> {
    csv::Writer::from_path(path).map_err(csv_err)
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn trades_path(&self, label: &str) -> PathBuf {
        self.output_dir.join(format!("{}_trades.csv", label))
    }

    pub fn equity_path(&self, label: &str) -> PathBuf {
        self.output_dir.join(format!("{}_equity.csv", label))
    }

    pub fn summary_path(&self, label: &str) -> PathBuf {
        self.output_dir.join(format!("{}_summary.csv", label))
    }

    fn write_trades(&self, result: &BacktestResult, label: &str) -> Result<(), StratsimError> {
        let mut wtr = writer(&self.trades_path(label))?;
        wtr.write_record(TRADE_HEADER).map_err(csv_err)?;
        for t in &result.trades {
            wtr.write_record([
                t.side.to_string(),
                format_millis(t.entry_time),
                format_millis(t.exit_time),
                t.entry_price.to_string(),
                t.exit_price.to_string(),
                t.quantity.to_string(),
                t.exit_reason.to_string(),
                format!("{:.8}", t.profit),
                format!("{:.4}", t.profit_percent),
                format!("{:.8}", t.entry_fee),
                format!("{:.8}", t.exit_fee),
                format!("{:.8}", t.slippage_cost),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_equity(&self, result: &BacktestResult, label: &str) -> Result<(), StratsimError> {
        let mut wtr = writer(&self.equity_path(label))?;
        wtr.write_record(["timestamp", "time", "balance"])
            .map_err(csv_err)?;
        for p in &result.equity_curve {
            wtr.write_record([
                p.timestamp.to_string(),
                format_millis(p.timestamp),
                format!("{:.8}", p.balance),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        label: &str,
    ) -> Result<(), StratsimError> {
        let m = &result.metrics;
        let mode = match strategy.mode {
            SignalMode::Conditions(_) => "conditions",
            SignalMode::Composite(_) => "composite",
        };
        let rows: Vec<(&str, String)> = vec![
            ("strategy", strategy.name.clone()),
            ("mode", mode.to_string()),
            ("label", label.to_string()),
            ("initial_balance", format!("{:.2}", m.initial_balance)),
            ("final_balance", format!("{:.2}", m.final_balance)),
            ("total_return", format!("{:.4}", m.total_return)),
            ("total_trades", m.total_trades.to_string()),
            ("winning_trades", m.winning_trades.to_string()),
            ("losing_trades", m.losing_trades.to_string()),
            ("win_rate", format!("{:.2}", m.win_rate)),
            ("profit_factor", format!("{:.4}", m.profit_factor)),
            ("max_drawdown", format!("{:.4}", m.max_drawdown)),
            ("max_drawdown_duration", m.max_drawdown_duration.to_string()),
            ("avg_win", format!("{:.4}", m.avg_win)),
            ("avg_loss", format!("{:.4}", m.avg_loss)),
            ("largest_win", format!("{:.4}", m.largest_win)),
            ("largest_loss", format!("{:.4}", m.largest_loss)),
            ("avg_trade_duration_ms", format!("{:.0}", m.avg_trade_duration_ms)),
            ("total_fees", format!("{:.8}", m.total_fees)),
        ];

        let mut wtr = writer(&self.summary_path(label))?;
        wtr.write_record(["metric", "value"]).map_err(csv_err)?;
        for (name, value) in rows {
            wtr.write_record([name, value.as_str()]).map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        label: &str,
    ) -> Result<(), StratsimError> {
        fs::create_dir_all(&self.output_dir)?;
        self.write_trades(result, label)?;
        self.write_equity(result, label)?;
        self.write_summary(result, strategy, label)?;
        tracing::info!(
            label,
            dir = %self.output_dir.display(),
            trades = result.trades.len(),
            "report written"
        );
        Ok(())
    }
}
