//! Candle (OHLCV bar) representation.
//!
//! Candles arrive from the data collaborator already gap-filled and
//! deduplicated; the engine treats them as read-only and does not
//! re-validate `low <= open,close <= high` or strictly increasing `open_time`.

use chrono::DateTime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    /// Bar open time in milliseconds since the Unix epoch.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Render a millisecond timestamp as RFC 3339, falling back to the raw number.
pub fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

/// Extract closing prices, the default input of most indicators.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
