use serde::{Deserialize, Serialize};

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_dns_port() -> u16 {
    53
}

fn default_web_port() -> u16 {
    8080
}

fn default_max_in_flight_queries() -> usize {
    10_000
}

fn default_shutdown_grace_period_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_dns_port")]
    pub dns_port: u16,
    #[serde(default = "default_web_port")]
    pub web_port: u16,
    /// Soft bound on total in-flight queries (§5), tracked as a gauge.
    #[serde(default = "default_max_in_flight_queries")]
    pub max_in_flight_queries: usize,
    #[serde(default = "default_shutdown_grace_period_secs")]
    pub shutdown_grace_period_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            dns_port: default_dns_port(),
            web_port: default_web_port(),
            max_in_flight_queries: default_max_in_flight_queries(),
            shutdown_grace_period_secs: default_shutdown_grace_period_secs(),
        }
    }
}
