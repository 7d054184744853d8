#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

pub use stratsim::domain::candle::Candle;
use stratsim::domain::condition::OrderType;
use stratsim::domain::condition_parser::parse_group;
use stratsim::domain::error::StratsimError;
use stratsim::domain::risk::RiskConfig;
use stratsim::domain::strategy::{ConditionRules, SignalMode, Strategy};
use stratsim::ports::data_port::DataPort;
use stratsim::ports::metrics_port::MetricsSink;

pub const HOUR_MS: i64 = 3_600_000;
pub const START_MS: i64 = 1_704_067_200_000;

pub fn candle(index: usize, close: f64) -> Candle {
    Candle {
        open_time: START_MS + index as i64 * HOUR_MS,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.0,
    }
}

pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| candle(i, c))
        .collect()
}

pub fn flat_candles(len: usize, price: f64) -> Vec<Candle> {
    (0..len).map(|i| candle(i, price)).collect()
}

/// Deterministic wave with drift, wide enough to trigger crossovers.
pub fn wave_candles(len: usize) -> Vec<Candle> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + (t * 0.15).sin() * 8.0 + (t * 0.04).cos() * 4.0 + t * 0.02;
            Candle {
                open_time: START_MS + i as i64 * HOUR_MS,
                open: close - 0.3,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0 + t,
            }
        })
        .collect()
}

pub fn risk() -> RiskConfig {
    RiskConfig {
        initial_balance: 10_000.0,
        ..RiskConfig::default()
    }
}

pub fn group(lines: &[&str], order_type: OrderType) -> stratsim::domain::condition::ConditionGroup {
    parse_group(lines.iter().copied(), order_type).unwrap()
}

pub fn long_strategy(entry: &[&str], exit: &[&str]) -> Strategy {
    Strategy {
        name: "test".to_string(),
        description: String::new(),
        mode: SignalMode::Conditions(ConditionRules {
            entry_long: group(entry, OrderType::Entry),
            exit_long: group(exit, OrderType::Exit),
            ..ConditionRules::default()
        }),
    }
}

pub fn sma_cross_strategy() -> Strategy {
    long_strategy(
        &["SMA(5) CROSSES_ABOVE SMA(20)"],
        &["SMA(5) CROSSES_BELOW SMA(20)"],
    )
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(
        &self,
        symbol: &str,
        _interval: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<Candle>, StratsimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StratsimError::Data {
                reason: reason.clone(),
            });
        }
        let candles: Vec<Candle> = self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|c| start_ms.is_none_or(|s| c.open_time >= s))
            .filter(|c| end_ms.is_none_or(|e| c.open_time <= e))
            .collect();
        if candles.is_empty() {
            return Err(StratsimError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(candles)
    }

    fn data_range(
        &self,
        symbol: &str,
        _interval: &str,
    ) -> Result<Option<(i64, i64, usize)>, StratsimError> {
        Ok(self.data.get(symbol).and_then(|c| match (c.first(), c.last()) {
            (Some(f), Some(l)) => Some((f.open_time, l.open_time, c.len())),
            _ => None,
        }))
    }
}

/// Captures every counter and gauge a run emits.
#[derive(Default)]
pub struct RecordingMetricsSink {
    pub counters: Mutex<HashMap<&'static str, u64>>,
    pub gauges: Mutex<Vec<(&'static str, f64)>>,
}

impl RecordingMetricsSink {
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn gauge_values(&self, name: &str) -> Vec<f64> {
        self.gauges
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn increment(&self, name: &'static str, value: u64) {
        *self.counters.lock().unwrap().entry(name).or_insert(0) += value;
    }

    fn gauge(&self, name: &'static str, value: f64) {
        self.gauges.lock().unwrap().push((name, value));
    }
}
