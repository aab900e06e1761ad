use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> usize {
    100_000
}

fn default_min_ttl_secs() -> u32 {
    60
}

fn default_max_ttl_secs() -> u32 {
    24 * 3600
}

fn default_negative_ttl_secs() -> u32 {
    5 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// §6.2 cache sub-config: `{enabled, max-entries, min-TTL, max-TTL,
/// negative-TTL}` plus the background sweeper period (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_min_ttl_secs")]
    pub min_ttl_secs: u32,
    #[serde(default = "default_max_ttl_secs")]
    pub max_ttl_secs: u32,
    #[serde(default = "default_negative_ttl_secs")]
    pub negative_ttl_secs: u32,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_entries: default_max_entries(),
            min_ttl_secs: default_min_ttl_secs(),
            max_ttl_secs: default_max_ttl_secs(),
            negative_ttl_secs: default_negative_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// clamp(min-answer-TTL, cache.min-TTL, cache.max-TTL) from §4.1 stage 10.
    pub fn clamp_ttl(&self, answer_ttl: u32) -> u32 {
        answer_ttl.clamp(self.min_ttl_secs, self.max_ttl_secs)
    }
}
