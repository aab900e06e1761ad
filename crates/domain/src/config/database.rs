use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "sentry-dns.sqlite3".to_string()
}

fn default_query_log_buffer_size() -> usize {
    1_000
}

fn default_query_log_batch_size() -> usize {
    100
}

fn default_query_log_flush_interval_ms() -> u64 {
    5_000
}

fn default_retention_days() -> u32 {
    30
}

fn default_write_pool_max_connections() -> u32 {
    3
}

fn default_read_pool_max_connections() -> u32 {
    8
}

fn default_busy_timeout_secs() -> u64 {
    30
}

fn default_wal_autocheckpoint() -> u32 {
    10_000
}

fn default_retention_sweep_interval_secs() -> u64 {
    3600
}

/// §6.2 database sub-config: `{buffer-size, batch-size, flush-interval,
/// retention}` plus the SQLite connection-pool tuning this codebase's
/// storage layer already exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_query_log_buffer_size")]
    pub query_log_buffer_size: usize,
    #[serde(default = "default_query_log_batch_size")]
    pub query_log_batch_size: usize,
    #[serde(default = "default_query_log_flush_interval_ms")]
    pub query_log_flush_interval_ms: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_retention_sweep_interval_secs")]
    pub retention_sweep_interval_secs: u64,
    #[serde(default = "default_write_pool_max_connections")]
    pub write_pool_max_connections: u32,
    #[serde(default = "default_read_pool_max_connections")]
    pub read_pool_max_connections: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
    #[serde(default = "default_wal_autocheckpoint")]
    pub wal_autocheckpoint: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            query_log_buffer_size: default_query_log_buffer_size(),
            query_log_batch_size: default_query_log_batch_size(),
            query_log_flush_interval_ms: default_query_log_flush_interval_ms(),
            retention_days: default_retention_days(),
            retention_sweep_interval_secs: default_retention_sweep_interval_secs(),
            write_pool_max_connections: default_write_pool_max_connections(),
            read_pool_max_connections: default_read_pool_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
            wal_autocheckpoint: default_wal_autocheckpoint(),
        }
    }
}
