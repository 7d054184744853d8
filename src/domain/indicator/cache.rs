//! Memoized indicator series for one candle series.
//!
//! Entries are keyed by the series fingerprint plus the full indicator
//! identity, so two conditions referencing `SMA(20)` share one computation
//! and a cache built for one symbol can never answer for another.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorKind, IndicatorSeries};
use std::collections::HashMap;
use std::fmt;

/// BLAKE3 fingerprint of a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesId([u8; 32]);

impl SeriesId {
    /// Hash open time and every OHLCV value in order.
    pub fn of(candles: &[Candle]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for c in candles {
            hasher.update(&c.open_time.to_le_bytes());
            hasher.update(&c.open.to_le_bytes());
            hasher.update(&c.high.to_le_bytes());
            hasher.update(&c.low.to_le_bytes());
            hasher.update(&c.close.to_le_bytes());
            hasher.update(&c.volume.to_le_bytes());
        }
        SeriesId(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

pub struct IndicatorCache<'a> {
    candles: &'a [Candle],
    series_id: SeriesId,
    entries: HashMap<(SeriesId, IndicatorKind), IndicatorSeries>,
}

impl<'a> IndicatorCache<'a> {
    pub fn new(candles: &'a [Candle]) -> Self {
        Self {
            candles,
            series_id: SeriesId::of(candles),
            entries: HashMap::new(),
        }
    }

    pub fn candles(&self) -> &'a [Candle] {
        self.candles
    }

    pub fn series_id(&self) -> SeriesId {
        self.series_id
    }

    /// Compute `kind` if it is not cached yet.
    pub fn ensure(&mut self, kind: IndicatorKind) {
        let candles = self.candles;
        self.entries
            .entry((self.series_id, kind))
            .or_insert_with(|| {
                tracing::debug!(indicator = %kind, bars = candles.len(), "computing indicator");
                kind.compute(candles)
            });
    }

    /// Look up an already-computed series.
    pub fn series(&self, kind: IndicatorKind) -> Option<&IndicatorSeries> {
        self.entries.get(&(self.series_id, kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
