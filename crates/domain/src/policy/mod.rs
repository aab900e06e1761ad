pub mod context;
pub mod expr;

pub use context::Context;
pub use expr::CompiledExpr;

use crate::errors::DomainError;
use crate::upstream::Upstream;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSubAction {
    Drop,
    Nxdomain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBucket {
    Client,
    Rule,
    Domain,
    ClientDomain,
    ClientRule,
}

#[derive(Debug, Clone)]
pub struct RateLimitSpec {
    pub rps: f64,
    pub burst: u32,
    pub action: RateLimitSubAction,
    pub bucket: RateLimitBucket,
}

/// The decision a matching policy rule produces (§3 PolicyRule actions).
#[derive(Debug, Clone)]
pub enum Action {
    Block,
    Allow,
    Redirect(IpAddr),
    Forward(Vec<Upstream>),
    RateLimit(RateLimitSpec),
}

impl Action {
    /// Parses `action` + its `action_data` string into a typed `Action`.
    pub fn parse(action: &str, action_data: &str) -> Result<Self, DomainError> {
        match action.to_ascii_uppercase().as_str() {
            "BLOCK" => Ok(Action::Block),
            "ALLOW" => Ok(Action::Allow),
            "REDIRECT" => {
                let ip = action_data
                    .trim()
                    .parse::<IpAddr>()
                    .map_err(|_| DomainError::ConfigError(format!("invalid REDIRECT target '{action_data}'")))?;
                Ok(Action::Redirect(ip))
            }
            "FORWARD" => {
                let upstreams = action_data
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(Upstream::parse)
                    .collect::<Result<Vec<_>, _>>()?;
                if upstreams.is_empty() {
                    return Err(DomainError::ConfigError(
                        "FORWARD action requires at least one upstream".into(),
                    ));
                }
                Ok(Action::Forward(upstreams))
            }
            "RATE_LIMIT" => Ok(Action::RateLimit(parse_rate_limit(action_data)?)),
            other => Err(DomainError::ConfigError(format!("unknown policy action '{other}'"))),
        }
    }
}

fn parse_rate_limit(data: &str) -> Result<RateLimitSpec, DomainError> {
    let mut rps = None;
    let mut burst = None;
    let mut action = None;
    let mut bucket = None;

    for pair in data.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| DomainError::ConfigError(format!("malformed RATE_LIMIT field '{pair}'")))?;
        match key.trim() {
            "rps" => {
                rps = Some(value.trim().parse::<f64>().map_err(|_| {
                    DomainError::ConfigError(format!("invalid rps value '{value}'"))
                })?)
            }
            "burst" => {
                burst = Some(value.trim().parse::<u32>().map_err(|_| {
                    DomainError::ConfigError(format!("invalid burst value '{value}'"))
                })?)
            }
            "action" => {
                action = Some(match value.trim() {
                    "drop" => RateLimitSubAction::Drop,
                    "nxdomain" => RateLimitSubAction::Nxdomain,
                    other => {
                        return Err(DomainError::ConfigError(format!(
                            "invalid RATE_LIMIT action '{other}'"
                        )))
                    }
                })
            }
            "bucket" => {
                bucket = Some(match value.trim() {
                    "client" => RateLimitBucket::Client,
                    "rule" => RateLimitBucket::Rule,
                    "domain" => RateLimitBucket::Domain,
                    "client+domain" => RateLimitBucket::ClientDomain,
                    "client+rule" => RateLimitBucket::ClientRule,
                    other => {
                        return Err(DomainError::ConfigError(format!(
                            "invalid RATE_LIMIT bucket '{other}'"
                        )))
                    }
                })
            }
            other => return Err(DomainError::ConfigError(format!("unknown RATE_LIMIT field '{other}'"))),
        }
    }

    Ok(RateLimitSpec {
        rps: rps.ok_or_else(|| DomainError::ConfigError("RATE_LIMIT missing 'rps'".into()))?,
        burst: burst.ok_or_else(|| DomainError::ConfigError("RATE_LIMIT missing 'burst'".into()))?,
        action: action.unwrap_or(RateLimitSubAction::Drop),
        bucket: bucket.unwrap_or(RateLimitBucket::Client),
    })
}

/// A single compiled policy rule (§3 PolicyRule, §4.5). Rules are stored
/// and evaluated in the order they appear in the installed rule set —
/// unlike forwarding rules, policy rules are not priority-sorted, the
/// `priority` field only affects presentation/ordering at configuration
/// time.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub name: String,
    pub priority: i32,
    pub expr: CompiledExpr,
    pub action: Action,
    pub enabled: bool,
}

impl PolicyRule {
    pub fn compile(
        name: impl Into<String>,
        priority: i32,
        source: &str,
        action: &str,
        action_data: &str,
        enabled: bool,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            name: name.into(),
            priority,
            expr: CompiledExpr::compile(source)?,
            action: Action::parse(action, action_data)?,
            enabled,
        })
    }
}

/// Compiles an entire ordered rule set; any single compilation failure
/// refuses the whole set (§4.5 Compile contract).
pub fn compile_rule_set(
    rules: &[(String, i32, String, String, String, bool)],
) -> Result<Vec<PolicyRule>, DomainError> {
    rules
        .iter()
        .map(|(name, priority, source, action, action_data, enabled)| {
            PolicyRule::compile(name.clone(), *priority, source, action, action_data, *enabled)
        })
        .collect()
}

/// Evaluate rules in stored order; first enabled rule whose expression
/// evaluates `true` wins. Runtime errors are treated as non-matching and
/// the caller should log them (handled at the infrastructure layer where
/// `tracing` is available).
pub fn evaluate_rules<'a>(
    rules: &'a [PolicyRule],
    ctx: &Context,
) -> (Option<&'a PolicyRule>, Vec<(&'a str, String)>) {
    let mut errors = Vec::new();
    for rule in rules {
        if !rule.enabled {
            continue;
        }
        match rule.expr.evaluate(ctx) {
            Ok(true) => return (Some(rule), errors),
            Ok(false) => continue,
            Err(e) => errors.push((rule.name.as_str(), e)),
        }
    }
    (None, errors)
}

/// Timeout applied to a FORWARD-overridden upstream list when the rule
/// does not specify one explicitly; mirrors the forwarder's own default.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(2);
