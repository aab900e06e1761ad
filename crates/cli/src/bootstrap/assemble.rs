//! Converts the raw, serde-deserialized config sections into the compiled
//! domain types the core runs against (§6.2): policy rules, forwarding
//! rules, local records, and the initial blocklist snapshot. `Config`
//! itself only stores the text form; compiling it is a one-time startup
//! step here, not something the hot path ever repeats.

use sentry_dns_domain::config::{
    BlockingConfig, ForwardingConfig, LocalRecordsConfig, PolicyConfig,
};
use sentry_dns_domain::{
    parse_list_text, BlocklistSnapshot, DomainPattern, ForwardingRule, LocalRecord, ParsedEntry,
    PolicyRule, RecordPayload, RecordType, SubnetMatcher, Upstream,
};
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

pub fn build_policy_rules(cfg: &PolicyConfig) -> anyhow::Result<Vec<PolicyRule>> {
    cfg.rules
        .iter()
        .map(|rule| {
            PolicyRule::compile(
                rule.name.clone(),
                rule.priority,
                &rule.expression,
                &rule.action,
                &rule.action_data,
                rule.enabled,
            )
            .map_err(anyhow::Error::from)
        })
        .collect()
}

pub fn build_forwarding_rules(cfg: &ForwardingConfig) -> anyhow::Result<Vec<ForwardingRule>> {
    cfg.rules
        .iter()
        .map(|rule| {
            let domain_patterns = rule
                .domain_patterns
                .iter()
                .map(|p| DomainPattern::parse(p))
                .collect::<Result<Vec<_>, _>>()?;
            let query_types = rule
                .query_types
                .iter()
                .filter_map(|s| RecordType::from_mnemonic(s))
                .collect();
            let built = ForwardingRule {
                name: rule.name.clone(),
                priority: rule.priority,
                domain_patterns,
                client_cidrs: SubnetMatcher::parse(&rule.client_cidrs)?,
                query_types,
                upstreams: Upstream::parse_list(&rule.upstreams)?,
                failover: rule.failover,
                timeout: Duration::from_secs(rule.timeout_secs),
                enabled: rule.enabled,
            };
            built.validate()?;
            Ok(built)
        })
        .collect()
}

pub fn build_local_records(cfg: &LocalRecordsConfig) -> anyhow::Result<Vec<LocalRecord>> {
    cfg.records
        .iter()
        .map(|record| {
            let payload = match record.record_type.to_ascii_uppercase().as_str() {
                "A" | "AAAA" => RecordPayload::Address(record.value.parse::<IpAddr>()?),
                "CNAME" => RecordPayload::Cname(record.value.clone()),
                "TXT" => RecordPayload::Txt(record.value.clone()),
                "NS" => RecordPayload::Ns(record.value.clone()),
                "PTR" => RecordPayload::Ptr(record.value.clone()),
                "MX" => {
                    let (preference, exchange) = record
                        .value
                        .split_once(' ')
                        .ok_or_else(|| anyhow::anyhow!("MX value '{}' must be '<preference> <exchange>'", record.value))?;
                    RecordPayload::Mx {
                        preference: preference.trim().parse()?,
                        exchange: exchange.trim().to_string(),
                    }
                }
                other => {
                    return Err(anyhow::anyhow!(
                        "unsupported local record type '{other}' for owner '{}'",
                        record.owner
                    ))
                }
            };
            Ok(LocalRecord::new(&record.owner, record.ttl_secs, payload))
        })
        .collect()
}

/// Reads each configured source file plus `custom_blocked`, builds the
/// snapshot the manager starts with. Unreadable sources are skipped with
/// a warning, the same tolerance `BlocklistControl::reload` applies later.
pub fn build_initial_blocklist_snapshot(cfg: &BlockingConfig) -> BlocklistSnapshot {
    let mut entries: Vec<ParsedEntry> = Vec::new();

    for path in &cfg.sources {
        match std::fs::read_to_string(path) {
            Ok(text) => entries.extend(parse_list_text(&text).0),
            Err(err) => warn!(path, error = %err, "blocklist source unreadable at startup, skipping"),
        }
    }

    let (custom, _) = parse_list_text(&cfg.custom_blocked.join("\n"));
    entries.extend(custom);

    sentry_dns_infrastructure::dns::blocklist::build_snapshot(entries, &cfg.whitelist)
}
