//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratsimError;
use crate::domain::strategy::Strategy;

/// Port for writing backtest results.
pub trait ReportPort {
    /// Persist one run. `label` identifies the run (usually the symbol).
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        label: &str,
    ) -> Result<(), StratsimError>;
}
