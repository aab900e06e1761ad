use serde::{Deserialize, Serialize};

fn default_ttl_secs() -> u32 {
    300
}

/// A single authoritative local record as read from configuration;
/// converted to a `dns_record::LocalRecord` (typed payload) at install
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRecordConfig {
    pub owner: String,
    pub record_type: String,
    pub value: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalRecordsConfig {
    #[serde(default)]
    pub records: Vec<LocalRecordConfig>,
}
