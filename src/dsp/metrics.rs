//! Per-instance processing timings
//!
//! Each engine owns its collector, so two streams never mix their numbers.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Timing summary for one named operation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TimingStats {
    /// Number of recorded calls
    pub calls: u64,
    /// Running mean of the elapsed time
    pub mean: Duration,
    /// Elapsed time of the most recent call
    pub last: Duration,
}

impl TimingStats {
    fn push(&mut self, elapsed: Duration) {
        self.calls += 1;
        let mean = self.mean.as_secs_f64();
        let updated = mean + (elapsed.as_secs_f64() - mean) / self.calls as f64;
        self.mean = Duration::from_secs_f64(updated.max(0.0));
        self.last = elapsed;
    }

    /// Fold another summary of the same operation into this one
    pub fn merge(&mut self, other: &TimingStats) {
        let calls = self.calls + other.calls;
        if calls == 0 {
            return;
        }
        let weighted = self.mean.as_secs_f64() * self.calls as f64
            + other.mean.as_secs_f64() * other.calls as f64;
        self.mean = Duration::from_secs_f64(weighted / calls as f64);
        self.calls = calls;
        self.last = other.last;
    }
}

/// Sink for operation timings
pub trait TimingCollector: Send {
    /// Record one call of `operation`
    fn record(&mut self, operation: &'static str, elapsed: Duration);

    /// Return everything recorded so far and start over
    fn drain(&mut self) -> BTreeMap<&'static str, TimingStats>;

    /// Collector for a forked engine
    ///
    /// Collectors that own their numbers start empty; collectors backed by a
    /// shared sink return another handle to the same sink.
    fn fork(&self) -> Box<dyn TimingCollector>;
}

/// Default collector: running mean and call count per operation
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    stats: BTreeMap<&'static str, TimingStats>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, operation: &str) -> Option<&TimingStats> {
        self.stats.get(operation)
    }
}

impl TimingCollector for MetricsCollector {
    fn record(&mut self, operation: &'static str, elapsed: Duration) {
        self.stats.entry(operation).or_default().push(elapsed);
    }

    fn drain(&mut self) -> BTreeMap<&'static str, TimingStats> {
        std::mem::take(&mut self.stats)
    }

    fn fork(&self) -> Box<dyn TimingCollector> {
        Box::new(MetricsCollector::new())
    }
}
