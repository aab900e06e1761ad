use dashmap::DashMap;
use sentry_dns_application::ports::MetricsSink;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// In-process metrics sink (§6.4): counters and gauges kept in a
/// `DashMap`, read back verbatim by the stats endpoint. No external
/// exporter lives in this crate.
#[derive(Default)]
pub struct AtomicMetricsSink {
    counters: DashMap<&'static str, AtomicU64>,
    gauges: DashMap<&'static str, AtomicI64>,
    histograms: DashMap<&'static str, HistogramAccumulator>,
}

#[derive(Default)]
struct HistogramAccumulator {
    count: AtomicU64,
    sum_ms: AtomicU64,
}

impl AtomicMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn gauge(&self, name: &str) -> i64 {
        self.gauges
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn histogram_avg_ms(&self, name: &str) -> f64 {
        self.histograms
            .get(name)
            .map(|h| {
                let count = h.count.load(Ordering::Relaxed);
                if count == 0 {
                    0.0
                } else {
                    h.sum_ms.load(Ordering::Relaxed) as f64 / count as f64
                }
            })
            .unwrap_or(0.0)
    }
}

impl MetricsSink for AtomicMetricsSink {
    fn incr_counter(&self, name: &'static str, value: u64) {
        self.counters
            .entry(name)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    fn set_gauge(&self, name: &'static str, value: i64) {
        self.gauges
            .entry(name)
            .or_insert_with(|| AtomicI64::new(0))
            .store(value, Ordering::Relaxed);
    }

    fn observe_histogram(&self, name: &'static str, value_ms: f64) {
        let entry = self.histograms.entry(name).or_default();
        entry.count.fetch_add(1, Ordering::Relaxed);
        entry.sum_ms.fetch_add(value_ms.max(0.0) as u64, Ordering::Relaxed);
    }
}
