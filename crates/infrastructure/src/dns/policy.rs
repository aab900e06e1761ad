use arc_swap::ArcSwap;
use dashmap::DashMap;
use sentry_dns_domain::policy::{RateLimitBucket, RateLimitSpec};
use sentry_dns_domain::{evaluate_rules, Action, Context, PolicyRule};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

/// Runtime holder for the compiled policy rule set (§4.5): an atomically
/// swapped ordered `Vec`, evaluated top-to-bottom, first enabled match
/// wins.
pub struct PolicyEngine {
    rules: ArcSwap<Vec<PolicyRule>>,
    limiter: RateLimiter,
}

impl PolicyEngine {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            limiter: RateLimiter::new(),
        }
    }

    pub fn update(&self, rules: Vec<PolicyRule>) {
        self.rules.store(Arc::new(rules));
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.load().is_empty()
    }

    /// Evaluates the rule set against `ctx`, additionally consulting the
    /// rate limiter when a `RATE_LIMIT` action matches. Returns the action
    /// to apply along with any per-rule evaluation errors (logged by the
    /// caller, never fatal to the query).
    pub fn evaluate(&self, ctx: &Context) -> (Option<Action>, Vec<(String, String)>) {
        let rules = self.rules.load();
        let (matched, errors) = evaluate_rules(&rules, ctx);
        let errors = errors
            .into_iter()
            .map(|(name, reason)| (name.to_string(), reason))
            .collect();

        // A RATE_LIMIT rule under budget is not an ALLOW: it must not skip
        // the blocklist stage the way an explicit ALLOW action does (§4.1
        // stage 3 "else continue"). Flattening it to `None` here makes the
        // caller treat it exactly like no rule matching at all.
        let action = matched.and_then(|rule| match &rule.action {
            Action::RateLimit(spec) => {
                if self.limiter.check(&rule.name, ctx, spec) {
                    None
                } else {
                    Some(Action::RateLimit(spec.clone()))
                }
            }
            other => Some(other.clone()),
        });

        (action, errors)
    }
}

/// Token-bucket rate limiter keyed per §4.5's bucket granularity
/// (client/rule/domain combinations). Buckets are created lazily and are
/// not persisted across restarts (§9 open question).
struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Returns `true` if the query is allowed under the bucket's budget.
    fn check(&self, rule_name: &str, ctx: &Context, spec: &RateLimitSpec) -> bool {
        let key = bucket_key(rule_name, ctx, spec.bucket);
        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(spec.rps, spec.burst as f64));
        bucket.allow(spec.rps, spec.burst as f64)
    }
}

fn bucket_key(rule_name: &str, ctx: &Context, bucket: RateLimitBucket) -> String {
    match bucket {
        RateLimitBucket::Client => format!("client:{}", ctx.client_ip),
        RateLimitBucket::Rule => format!("rule:{}", rule_name),
        RateLimitBucket::Domain => format!("domain:{}", ctx.domain),
        RateLimitBucket::ClientDomain => format!("client-domain:{}:{}", ctx.client_ip, ctx.domain),
        RateLimitBucket::ClientRule => format!("client-rule:{}:{}", ctx.client_ip, rule_name),
    }
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(rps: f64, burst: f64) -> Self {
        Self {
            tokens: burst.max(rps),
            last_refill: Instant::now(),
        }
    }

    fn allow(&mut self, rps: f64, burst: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * rps).min(burst);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rule_set_allows_everything() {
        let engine = PolicyEngine::new(Vec::new());
        assert_eq!(engine.len(), 0);
    }

    #[test]
    fn token_bucket_exhausts_then_refills() {
        let mut bucket = TokenBucket::new(1.0, 2.0);
        assert!(bucket.allow(1.0, 2.0));
        assert!(bucket.allow(1.0, 2.0));
        assert!(!bucket.allow(1.0, 2.0));
    }

    /// A RATE_LIMIT rule under budget must fall through as "no decision",
    /// not as `Action::Allow` — otherwise it would silently skip the
    /// blocklist stage the way an explicit ALLOW action does.
    #[test]
    fn rate_limit_under_budget_yields_no_action_not_allow() {
        let rule = PolicyRule::compile(
            "gaming-rate-limit",
            1,
            r#"DomainEndsWith(Domain, ".gaming.com")"#,
            "RATE_LIMIT",
            "rps=100,burst=200",
            true,
        )
        .unwrap();
        let engine = PolicyEngine::new(vec![rule]);

        let ctx = Context {
            domain: Arc::from("ads.gaming.com"),
            client_ip: IpAddr::from([127, 0, 0, 1]),
            query_type: "A",
            hour: 0,
            minute: 0,
            day: 1,
            month: 1,
            weekday: 0,
        };

        let (action, errors) = engine.evaluate(&ctx);
        assert!(errors.is_empty());
        assert!(action.is_none(), "expected pass-through, got {action:?}");
    }
}
