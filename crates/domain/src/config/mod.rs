pub mod blocking;
pub mod cache;
pub mod database;
pub mod dns;
pub mod forwarding;
pub mod local_records;
pub mod logging;
pub mod policy;
pub mod server;

pub use blocking::BlockingConfig;
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use dns::DnsConfig;
pub use forwarding::ForwardingConfig;
pub use local_records::LocalRecordsConfig;
pub use logging::LoggingConfig;
pub use policy::PolicyConfig;
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_blocklist_enabled() -> bool {
    true
}

fn default_policy_enabled() -> bool {
    true
}

/// §3 KillSwitch configured defaults; the runtime override state lives in
/// `domain::killswitch`, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    #[serde(default = "default_blocklist_enabled")]
    pub blocklist_enabled: bool,
    #[serde(default = "default_policy_enabled")]
    pub policy_enabled: bool,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            blocklist_enabled: default_blocklist_enabled(),
            policy_enabled: default_policy_enabled(),
        }
    }
}

/// The full configuration surface consumed by the core (§6.2). Assembled
/// by the CLI bootstrap layer from a TOML file (if any) with CLI
/// overrides applied on top.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub forwarding: ForwardingConfig,
    #[serde(default)]
    pub local_records: LocalRecordsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub killswitch: KillSwitchConfig,
}

/// CLI-supplied overrides merged onto a loaded (or default) `Config`.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub web_port: Option<u16>,
    pub bind_address: Option<String>,
}

impl Config {
    /// Loads from `path` if given, otherwise starts from defaults; then
    /// applies `overrides`. Does not validate — call `validate()` next.
    pub fn load(path: Option<&Path>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                    path: path.display().to_string(),
                    source: e,
                })?;
                toml::from_str::<Config>(&text)?
            }
            None => Config::default(),
        };

        if let Some(port) = overrides.dns_port {
            config.server.dns_port = port;
        }
        if let Some(port) = overrides.web_port {
            config.server.web_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            config.server.bind_address = bind;
        }

        Ok(config)
    }

    /// Cross-field validation per §7 "Configuration error": bad
    /// expressions, unparseable CIDRs, out-of-range priorities are all
    /// caught here before anything is installed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns.upstreams.is_empty() {
            return Err(ConfigError::Invalid("dns.upstreams must not be empty".into()));
        }
        for upstream in &self.dns.upstreams {
            crate::upstream::Upstream::parse(upstream)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        if self.cache.min_ttl_secs > self.cache.max_ttl_secs {
            return Err(ConfigError::Invalid(
                "cache.min_ttl_secs must be <= cache.max_ttl_secs".into(),
            ));
        }
        for rule in &self.policy.rules {
            crate::policy::CompiledExpr::compile(&rule.expression)
                .map_err(|e| ConfigError::Invalid(format!("policy rule '{}': {e}", rule.name)))?;
            crate::policy::Action::parse(&rule.action, &rule.action_data)
                .map_err(|e| ConfigError::Invalid(format!("policy rule '{}': {e}", rule.name)))?;
        }
        for rule in &self.forwarding.rules {
            if rule.priority == 0 || rule.priority > 100 {
                return Err(ConfigError::Invalid(format!(
                    "forwarding rule '{}' priority out of range [1,100]",
                    rule.name
                )));
            }
            for cidr in &rule.client_cidrs {
                cidr.parse::<ipnetwork::IpNetwork>()
                    .map_err(|_| ConfigError::Invalid(format!("invalid CIDR '{cidr}' in rule '{}'", rule.name)))?;
            }
            for upstream in &rule.upstreams {
                crate::upstream::Upstream::parse(upstream)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            }
        }
        Ok(())
    }
}
