//! Run instrumentation port.
//!
//! The engine reports counters and gauges through a sink passed in by
//! reference, so concurrent runs never share hidden state and tests can
//! record what a run emitted.

pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &'static str, value: u64);
    fn gauge(&self, name: &'static str, value: f64);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn increment(&self, _name: &'static str, _value: u64) {}
    fn gauge(&self, _name: &'static str, _value: f64) {}
}
