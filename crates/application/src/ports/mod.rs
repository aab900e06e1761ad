pub mod blocklist_control;
pub mod metrics_sink;
pub mod query_log_storage;

pub use blocklist_control::BlocklistControl;
pub use metrics_sink::MetricsSink;
pub use query_log_storage::QueryLogStorage;
