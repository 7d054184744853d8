//! `MetricsSink` that emits every event through `tracing` and keeps
//! running counter totals for an end-of-run summary.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::ports::metrics_port::MetricsSink;

#[derive(Debug, Default)]
pub struct TracingMetricsSink {
    counters: Mutex<BTreeMap<&'static str, u64>>,
}

impl TracingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter totals so far, sorted by name.
    pub fn counters(&self) -> Vec<(&'static str, u64)> {
        match self.counters.lock() {
            Ok(map) => map.iter().map(|(k, v)| (*k, *v)).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|(k, v)| (*k, *v))
                .collect(),
        }
    }

    pub fn log_summary(&self) {
        for (name, total) in self.counters() {
            tracing::info!(metric = name, total, "counter total");
        }
    }
}

impl MetricsSink for TracingMetricsSink {
    fn increment(&self, name: &'static str, value: u64) {
        tracing::trace!(metric = name, value, "increment");
        let mut map = match self.counters.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        *map.entry(name).or_insert(0) += value;
    }

    fn gauge(&self, name: &'static str, value: f64) {
        tracing::debug!(metric = name, value, "gauge");
    }
}
