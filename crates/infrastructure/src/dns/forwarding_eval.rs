use arc_swap::ArcSwap;
use sentry_dns_domain::{evaluate_forwarding_rules, ForwardingRule, RecordType};
use std::net::IpAddr;
use std::sync::Arc;

/// Runtime holder for the conditional forwarding rule set (§4.6). Rules
/// are kept pre-sorted by descending priority so evaluation is a single
/// linear scan for the first match.
pub struct ForwardingEvaluator {
    rules: ArcSwap<Vec<ForwardingRule>>,
}

impl ForwardingEvaluator {
    pub fn new(mut rules: Vec<ForwardingRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            rules: ArcSwap::from_pointee(rules),
        }
    }

    pub fn update(&self, mut rules: Vec<ForwardingRule>) {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        self.rules.store(Arc::new(rules));
    }

    pub fn is_empty(&self) -> bool {
        self.rules.load().is_empty()
    }

    pub fn evaluate(&self, domain: &str, client_ip: IpAddr, query_type: RecordType) -> Option<ForwardingRule> {
        let rules = self.rules.load();
        evaluate_forwarding_rules(&rules, domain, client_ip, query_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentry_dns_domain::{DomainPattern, SubnetMatcher, Upstream};
    use std::time::Duration;

    fn rule(name: &str, priority: u8, pattern: &str) -> ForwardingRule {
        ForwardingRule {
            name: name.to_string(),
            priority,
            domain_patterns: vec![DomainPattern::parse(pattern).unwrap()],
            client_cidrs: SubnetMatcher::parse(&[]).unwrap(),
            query_types: Vec::new(),
            upstreams: vec![Upstream::parse("10.0.0.1:53").unwrap()],
            failover: false,
            timeout: Duration::from_secs(2),
            enabled: true,
        }
    }

    #[test]
    fn higher_priority_rule_wins_after_update() {
        let eval = ForwardingEvaluator::new(vec![rule("low", 10, "*.corp.test")]);
        eval.update(vec![rule("low", 10, "*.corp.test"), rule("high", 90, "*.corp.test")]);
        let matched = eval
            .evaluate("a.corp.test", "127.0.0.1".parse().unwrap(), RecordType::A)
            .unwrap();
        assert_eq!(matched.name, "high");
    }
}
