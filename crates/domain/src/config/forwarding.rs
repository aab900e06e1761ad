use serde::{Deserialize, Serialize};

fn default_priority() -> u8 {
    50
}

fn default_timeout_secs() -> u64 {
    2
}

fn default_enabled() -> bool {
    true
}

/// Raw, not-yet-validated conditional forwarding rule as read from
/// configuration (§3 ForwardingRule, §6.2). Converted to
/// `domain::forwarding_rule::ForwardingRule` (compiled patterns, parsed
/// upstreams) at install time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardingRuleConfig {
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub domain_patterns: Vec<String>,
    #[serde(default)]
    pub client_cidrs: Vec<String>,
    #[serde(default)]
    pub query_types: Vec<String>,
    pub upstreams: Vec<String>,
    #[serde(default)]
    pub failover: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ForwardingConfig {
    #[serde(default)]
    pub rules: Vec<ForwardingRuleConfig>,
}
