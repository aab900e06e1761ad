pub mod blocklist;
pub mod config;
pub mod dns_query;
pub mod dns_record;
pub mod errors;
pub mod forwarding_rule;
pub mod killswitch;
pub mod policy;
pub mod query_event;
pub mod subnet;
pub mod upstream;

pub use blocklist::{parse_list_text, BlocklistSnapshot, ParsedEntry};
pub use config::{CliOverrides, Config, ConfigError};
pub use dns_query::{normalize_domain, DnsQuery, RecordType};
pub use dns_record::{LocalRecord, RecordPayload, MAX_CNAME_CHAIN_DEPTH};
pub use errors::DomainError;
pub use forwarding_rule::{evaluate_forwarding_rules, DomainPattern, ForwardingRule};
pub use killswitch::{KillSwitch, KillSwitchSnapshot, KillSwitchState};
pub use policy::{compile_rule_set, evaluate_rules, Action, CompiledExpr, Context, PolicyRule};
pub use query_event::{QueryEvent, QueryLogFilter, QueryStats};
pub use subnet::SubnetMatcher;
pub use upstream::Upstream;
