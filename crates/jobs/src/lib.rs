pub mod blocklist_sync;
pub mod query_log_retention;
pub mod runner;

pub use blocklist_sync::BlocklistSyncJob;
pub use query_log_retention::QueryLogRetentionJob;
pub use runner::JobRunner;
