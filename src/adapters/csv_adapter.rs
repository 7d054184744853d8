//! CSV file data adapter.
//!
//! Reads `<base>/<SYMBOL>_<interval>.csv` with the header
//! `open_time,open,high,low,close,volume`. `open_time` is either epoch
//! milliseconds or an RFC 3339 timestamp.

use crate::domain::candle::Candle;
use crate::domain::error::StratsimError;
use crate::ports::data_port::DataPort;
use chrono::DateTime;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

fn data_err(reason: String) -> StratsimError {
    StratsimError::Data { reason }
}

fn parse_open_time(raw: &str) -> Result<i64, StratsimError> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| data_err(format!("invalid open_time '{}': {}", raw, e)))
}

fn parse_column(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, StratsimError> {
    let raw = record
        .get(idx)
        .ok_or_else(|| data_err(format!("missing {} column", name)))?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| data_err(format!("invalid {} value '{}': {}", name, raw, e)))?;
    if !value.is_finite() {
        return Err(data_err(format!("non-finite {} value '{}'", name, raw)));
    }
    Ok(value)
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }

    fn read_all(&self, symbol: &str, interval: &str) -> Result<Vec<Candle>, StratsimError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_err(format!("CSV parse error: {}", e)))?;
            let open_time = parse_open_time(
                record
                    .get(0)
                    .ok_or_else(|| data_err("missing open_time column".into()))?,
            )?;
            candles.push(Candle {
                open_time,
                open: parse_column(&record, 1, "open")?,
                high: parse_column(&record, 2, "high")?,
                low: parse_column(&record, 3, "low")?,
                close: parse_column(&record, 4, "close")?,
                volume: parse_column(&record, 5, "volume")?,
            });
        }

        candles.sort_by_key(|c| c.open_time);
        // Later rows win for a repeated open_time.
        let before = candles.len();
        candles.reverse();
        candles.dedup_by_key(|c| c.open_time);
        candles.reverse();
        if candles.len() != before {
            tracing::warn!(
                symbol,
                interval,
                dropped = before - candles.len(),
                "duplicate open_time rows dropped"
            );
        }
        Ok(candles)
    }

    /// Symbols with a data file for `interval`, sorted.
    pub fn list_symbols(&self, interval: &str) -> Result<Vec<String>, StratsimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_err(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", interval);
        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_err(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<Candle>, StratsimError> {
        let candles: Vec<Candle> = self
            .read_all(symbol, interval)?
            .into_iter()
            .filter(|c| start_ms.is_none_or(|s| c.open_time >= s))
            .filter(|c| end_ms.is_none_or(|e| c.open_time <= e))
            .collect();
        if candles.is_empty() {
            return Err(StratsimError::NoData {
                symbol: symbol.to_string(),
            });
        }
        tracing::debug!(symbol, interval, candles = candles.len(), "loaded candles");
        Ok(candles)
    }

    fn data_range(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<Option<(i64, i64, usize)>, StratsimError> {
        let candles = self.read_all(symbol, interval)?;
        Ok(match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Some((first.open_time, last.open_time, candles.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "open_time,open,high,low,close,volume\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = format!(
            "{HEADER}\
            1704074400000,105.0,115.0,100.0,110.0,60000\n\
            1704067200000,100.0,110.0,90.0,105.0,50000\n\
            2024-01-01T04:00:00Z,110.0,120.0,105.0,115.0,55000.5\n"
        );
        fs::write(path.join("BTCUSDT_2h.csv"), csv_content).unwrap();
        fs::write(path.join("ETHUSDT_2h.csv"), HEADER).unwrap();
        fs::write(path.join("ETHUSDT_1d.csv"), HEADER).unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_candles_sorts_and_parses() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let candles = adapter.fetch_candles("BTCUSDT", "2h", None, None).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].open_time, 1_704_067_200_000);
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].high, 110.0);
        assert_eq!(candles[0].low, 90.0);
        assert_eq!(candles[0].close, 105.0);
        assert_eq!(candles[2].open_time, 1_704_081_600_000);
        assert_eq!(candles[2].volume, 55000.5);
    }

    #[test]
    fn fetch_candles_filters_by_time() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let candles = adapter
            .fetch_candles("BTCUSDT", "2h", Some(1_704_074_400_000), Some(1_704_074_400_000))
            .unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 110.0);
    }

    #[test]
    fn duplicate_open_time_keeps_last_row() {
        let dir = TempDir::new().unwrap();
        let content = format!("{HEADER}0,1,2,0.5,1.5,10\n0,1,2,0.5,1.8,12\n");
        fs::write(dir.path().join("X_1m.csv"), content).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let candles = adapter.fetch_candles("X", "1m", None, None).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 1.8);
    }

    #[test]
    fn empty_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_candles("ETHUSDT", "2h", None, None);
        assert!(matches!(result, Err(StratsimError::NoData { .. })));
    }

    #[test]
    fn missing_file_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_candles("XYZ", "2h", None, None);
        assert!(matches!(result, Err(StratsimError::Data { .. })));
    }

    #[test]
    fn malformed_price_is_data_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X_1m.csv"), format!("{HEADER}0,1,2,abc,1.5,10\n")).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        match adapter.fetch_candles("X", "1m", None, None) {
            Err(StratsimError::Data { reason }) => assert!(reason.contains("low")),
            other => panic!("expected data error, got {other:?}"),
        }
    }

    #[test]
    fn data_range_reports_bounds() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(
            adapter.data_range("BTCUSDT", "2h").unwrap(),
            Some((1_704_067_200_000, 1_704_081_600_000, 3))
        );
        assert_eq!(adapter.data_range("ETHUSDT", "2h").unwrap(), None);
    }

    #[test]
    fn list_symbols_by_interval() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols("2h").unwrap(), vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(adapter.list_symbols("1d").unwrap(), vec!["ETHUSDT"]);
    }
}
