/// Minimal metrics surface the core emits to, kept deliberately narrow per
/// the ambient observability stack (no external exporter lives in this
/// crate; a collector can be bolted on behind this trait later).
pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &'static str, value: u64);

    fn set_gauge(&self, name: &'static str, value: i64);

    fn observe_histogram(&self, name: &'static str, value_ms: f64);
}
