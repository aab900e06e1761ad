use serde::{Deserialize, Serialize};

fn default_upstreams() -> Vec<String> {
    vec!["1.1.1.1:53".to_string(), "8.8.8.8:53".to_string()]
}

fn default_retries() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    2
}

fn default_local_record_ttl_secs() -> u32 {
    300
}

/// §6.2 DNS sub-config: default upstream list plus forwarder tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    #[serde(default = "default_upstreams")]
    pub upstreams: Vec<String>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_local_record_ttl_secs")]
    pub local_record_ttl_secs: u32,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            upstreams: default_upstreams(),
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
            local_record_ttl_secs: default_local_record_ttl_secs(),
        }
    }
}
