use crate::dns_query::RecordType;
use crate::errors::DomainError;
use crate::subnet::SubnetMatcher;
use crate::upstream::Upstream;
use fancy_regex::Regex;
use std::net::IpAddr;
use std::time::Duration;

/// A single domain matcher for conditional forwarding (§4.6).
#[derive(Debug, Clone)]
pub enum DomainPattern {
    Exact(String),
    WildcardSuffix(String),
    WildcardPrefix(String),
    Regex(Regex),
}

impl DomainPattern {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if let Some(stripped) = raw.strip_prefix("*.") {
            return Ok(DomainPattern::WildcardSuffix(stripped.to_ascii_lowercase()));
        }
        if let Some(stripped) = raw.strip_suffix(".*") {
            return Ok(DomainPattern::WildcardPrefix(stripped.to_ascii_lowercase()));
        }
        if let Some(inner) = raw.strip_prefix('/').and_then(|s| s.strip_suffix('/')) {
            let compiled = Regex::new(inner)
                .map_err(|e| DomainError::ConfigError(format!("invalid regex '{raw}': {e}")))?;
            return Ok(DomainPattern::Regex(compiled));
        }
        Ok(DomainPattern::Exact(raw.to_ascii_lowercase()))
    }

    pub fn matches(&self, domain: &str) -> bool {
        match self {
            DomainPattern::Exact(pattern) => domain == pattern,
            DomainPattern::WildcardSuffix(suffix) => {
                domain == suffix || domain.ends_with(&format!(".{suffix}"))
            }
            DomainPattern::WildcardPrefix(prefix) => {
                domain == prefix || domain.starts_with(&format!("{prefix}."))
            }
            DomainPattern::Regex(re) => re.is_match(domain).unwrap_or(false),
        }
    }
}

/// A priority-ordered rule selecting an upstream set for matching queries
/// (§3 ForwardingRule, §4.6). Priority range is 1–100, higher evaluated
/// first; an empty matcher category means "match any" in that category.
#[derive(Debug, Clone)]
pub struct ForwardingRule {
    pub name: String,
    pub priority: u8,
    pub domain_patterns: Vec<DomainPattern>,
    pub client_cidrs: SubnetMatcher,
    pub query_types: Vec<RecordType>,
    pub upstreams: Vec<Upstream>,
    pub failover: bool,
    pub timeout: Duration,
    pub enabled: bool,
}

impl ForwardingRule {
    /// A rule matches iff every non-empty matcher category passes.
    pub fn matches(&self, domain: &str, client_ip: IpAddr, query_type: RecordType) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.domain_patterns.is_empty()
            && !self.domain_patterns.iter().any(|p| p.matches(domain))
        {
            return false;
        }
        if !self.client_cidrs.is_empty() && !self.client_cidrs.contains(client_ip) {
            return false;
        }
        if !self.query_types.is_empty() && !self.query_types.contains(&query_type) {
            return false;
        }
        true
    }

    /// Validates priority range and that at least one matcher category is
    /// populated, per §4.6 install-time validation.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.priority == 0 || self.priority > 100 {
            return Err(DomainError::ConfigError(format!(
                "forwarding rule '{}' priority {} out of range [1,100]",
                self.name, self.priority
            )));
        }
        if self.domain_patterns.is_empty()
            && self.client_cidrs.is_empty()
            && self.query_types.is_empty()
        {
            return Err(DomainError::ConfigError(format!(
                "forwarding rule '{}' has no matcher categories",
                self.name
            )));
        }
        if self.upstreams.is_empty() {
            return Err(DomainError::ConfigError(format!(
                "forwarding rule '{}' has no upstreams",
                self.name
            )));
        }
        Ok(())
    }
}

/// Evaluate forwarding rules in descending priority order; first full
/// match wins. Rules must already be sorted by the caller (the evaluator
/// sorts once at install time, not per query).
pub fn evaluate_forwarding_rules<'a>(
    rules: &'a [ForwardingRule],
    domain: &str,
    client_ip: IpAddr,
    query_type: RecordType,
) -> Option<&'a ForwardingRule> {
    rules
        .iter()
        .find(|rule| rule.matches(domain, client_ip, query_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, priority: u8, suffix: &str) -> ForwardingRule {
        ForwardingRule {
            name: name.into(),
            priority,
            domain_patterns: vec![DomainPattern::parse(suffix).unwrap()],
            client_cidrs: SubnetMatcher::default(),
            query_types: vec![],
            upstreams: vec![Upstream::parse("10.0.0.1:53").unwrap()],
            failover: false,
            timeout: Duration::from_secs(2),
            enabled: true,
        }
    }

    #[test]
    fn descending_priority_first_match_wins() {
        let rules = vec![rule("low", 10, "*.corp"), rule("high", 90, "*.corp")];
        let mut sorted = rules;
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        let matched =
            evaluate_forwarding_rules(&sorted, "host.corp", "10.0.0.5".parse().unwrap(), RecordType::A)
                .unwrap();
        assert_eq!(matched.name, "high");
    }

    #[test]
    fn non_matching_domain_falls_through() {
        let rules = vec![rule("corp", 90, "*.corp")];
        assert!(evaluate_forwarding_rules(
            &rules,
            "example.com",
            "10.0.0.5".parse().unwrap(),
            RecordType::A
        )
        .is_none());
    }

    #[test]
    fn validate_rejects_empty_matchers() {
        let mut r = rule("bad", 10, "*.corp");
        r.domain_patterns.clear();
        assert!(r.validate().is_err());
    }
}
