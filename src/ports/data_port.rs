//! Market data access port trait.
//!
//! Implementations hand over candles already ordered by `open_time`,
//! deduplicated and gap-filled.

use crate::domain::candle::Candle;
use crate::domain::error::StratsimError;

pub trait DataPort {
    /// Candles for `symbol` on `interval`, optionally bounded to
    /// `[start_ms, end_ms]` by open time.
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<Candle>, StratsimError>;

    /// First open time, last open time and candle count, `None` when empty.
    fn data_range(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<Option<(i64, i64, usize)>, StratsimError>;
}
