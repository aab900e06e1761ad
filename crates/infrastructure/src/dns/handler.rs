use crate::dns::blocklist::BlocklistManager;
use crate::dns::cache::DnsCache;
use crate::dns::forwarder::{SocketPool, UpstreamForwarder};
use crate::dns::forwarding::{DnsResponse, RecordTypeMapper};
use crate::dns::forwarding_eval::ForwardingEvaluator;
use crate::dns::local_records::{LocalLookup, LocalRecordsStore};
use crate::dns::policy::PolicyEngine;
use crate::dns::query_logger::AsyncQueryLogger;
use crate::metrics::AtomicMetricsSink;

use chrono::{Datelike, Timelike, Utc};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::{Name, RData, Record};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use sentry_dns_application::ports::MetricsSink;
use sentry_dns_domain::policy::{Action, RateLimitSubAction};
use sentry_dns_domain::{Context, KillSwitch, QueryEvent, RecordType, Upstream};
use std::iter;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What the pipeline decided to answer with, plus the bookkeeping needed
/// for caching and logging (§4.1 stages 10-12).
struct Answer {
    rcode: ResponseCode,
    records: Vec<Record>,
    blocked: bool,
    cached: bool,
    upstream: Option<Arc<str>>,
    /// `Some(ttl)` when stage 10 should insert into the cache; whether it
    /// lands as a positive or negative entry follows from whether
    /// `records` is empty, same as `DnsCache::insert`'s own rule.
    cache_as: Option<u32>,
    /// AA bit (§6.1): set for local-record, BLOCK, and REDIRECT answers
    /// synthesized by this server; clear for anything forwarded or served
    /// from cache.
    authoritative: bool,
}

impl Answer {
    fn noerror(records: Vec<Record>) -> Self {
        Self {
            rcode: ResponseCode::NoError,
            records,
            blocked: false,
            cached: false,
            upstream: None,
            cache_as: None,
            authoritative: false,
        }
    }

    fn nxdomain(blocked: bool) -> Self {
        Self {
            rcode: ResponseCode::NXDomain,
            records: Vec::new(),
            blocked,
            cached: false,
            upstream: None,
            cache_as: None,
            authoritative: blocked,
        }
    }

    fn servfail() -> Self {
        Self {
            rcode: ResponseCode::ServFail,
            records: Vec::new(),
            blocked: false,
            cached: false,
            upstream: None,
            cache_as: None,
            authoritative: false,
        }
    }
}

/// Outcome of the decisional part of the pipeline (stages 2-9): either a
/// final answer, or silence (the RATE_LIMIT `drop` sub-action, §4.5).
enum Outcome {
    Answer(Answer),
    Drop,
}

/// The DNS request handler (§4.1): a `hickory_server::server::RequestHandler`
/// wired to every other core collaborator. One instance is shared across all
/// connections; all state it owns is either read-mostly (`Arc<...>`
/// snapshots) or internally synchronized.
pub struct DnsHandler {
    local_record_ttl_secs: u32,
    negative_ttl_secs: u32,
    default_timeout: Duration,
    retries: u32,

    killswitch: StdRwLock<KillSwitch>,
    policy: Arc<PolicyEngine>,
    local_records: Arc<LocalRecordsStore>,
    cache: Arc<DnsCache>,
    blocklist: Arc<BlocklistManager>,
    forwarding_eval: Arc<ForwardingEvaluator>,
    forwarder: Arc<UpstreamForwarder>,
    /// Shared with every ad-hoc forwarder the handler builds for a matched
    /// policy FORWARD or conditional-forwarding rule, so those short-lived
    /// forwarders still reuse pooled sockets instead of dialing fresh ones.
    socket_pool: Arc<SocketPool>,
    logger: Arc<AsyncQueryLogger>,
    metrics: Arc<AtomicMetricsSink>,
    active_queries: std::sync::atomic::AtomicI64,
}

pub struct DnsHandlerConfig {
    pub local_record_ttl_secs: u32,
    pub negative_ttl_secs: u32,
    pub default_timeout: Duration,
    pub retries: u32,
    pub killswitch: KillSwitch,
}

impl DnsHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: DnsHandlerConfig,
        policy: Arc<PolicyEngine>,
        local_records: Arc<LocalRecordsStore>,
        cache: Arc<DnsCache>,
        blocklist: Arc<BlocklistManager>,
        forwarding_eval: Arc<ForwardingEvaluator>,
        forwarder: Arc<UpstreamForwarder>,
        logger: Arc<AsyncQueryLogger>,
        metrics: Arc<AtomicMetricsSink>,
    ) -> Self {
        let socket_pool = forwarder.pool();
        Self {
            local_record_ttl_secs: cfg.local_record_ttl_secs,
            negative_ttl_secs: cfg.negative_ttl_secs,
            default_timeout: cfg.default_timeout,
            retries: cfg.retries,
            killswitch: StdRwLock::new(cfg.killswitch),
            policy,
            local_records,
            cache,
            blocklist,
            forwarding_eval,
            forwarder,
            socket_pool,
            logger,
            metrics,
            active_queries: std::sync::atomic::AtomicI64::new(0),
        }
    }

    /// Disables blocklist enforcement for `duration`, starting now (admin API).
    pub fn disable_blocklist_for(&self, duration: Duration) {
        self.killswitch.write().unwrap().blocklist.disable_for(Instant::now(), duration);
    }

    /// Disables policy enforcement for `duration`, starting now (admin API).
    pub fn disable_policy_for(&self, duration: Duration) {
        self.killswitch.write().unwrap().policy.disable_for(Instant::now(), duration);
    }

    fn build_context(domain: Arc<str>, client_ip: IpAddr, record_type: RecordType) -> Context {
        let now = Utc::now();
        Context {
            domain,
            client_ip,
            query_type: record_type.as_mnemonic(),
            hour: now.hour() as i64,
            minute: now.minute() as i64,
            day: now.day() as i64,
            month: now.month() as i64,
            weekday: now.weekday().num_days_from_sunday() as i64,
        }
    }

    /// Runs stages 2-10 of the pipeline for one query, producing either a
    /// final `Answer` or `Outcome::Drop` when rate-limited with `drop`.
    async fn process(&self, domain: Arc<str>, record_type: RecordType, client_ip: IpAddr) -> Outcome {
        // Stage 2: kill-switch read, once per query.
        let snapshot = self.killswitch.read().unwrap().snapshot(Instant::now());
        self.metrics.set_gauge("killswitch.blocklist_enabled", snapshot.blocklist_enabled as i64);
        self.metrics.set_gauge("killswitch.policy_enabled", snapshot.policy_enabled as i64);

        let mut skip_blocklist = false;
        let mut forward_override: Option<(Vec<Upstream>, Duration, bool)> = None;

        // Stage 3: policy engine.
        if snapshot.policy_enabled && !self.policy.is_empty() {
            let ctx = Self::build_context(domain.clone(), client_ip, record_type);
            let (action, errors) = self.policy.evaluate(&ctx);
            for (rule, reason) in errors {
                warn!(rule, reason, "policy rule evaluation error, rule skipped");
            }

            match action {
                Some(Action::Block) => return Outcome::Answer(Answer::nxdomain(true)),
                Some(Action::Allow) => skip_blocklist = true,
                Some(Action::Redirect(ip)) => {
                    let mut answer = Answer::noerror(synthesize_redirect(&domain, record_type, ip));
                    answer.authoritative = true;
                    return Outcome::Answer(answer);
                }
                Some(Action::Forward(upstreams)) => {
                    forward_override = Some((upstreams, self.default_timeout, true));
                }
                Some(Action::RateLimit(spec)) => {
                    self.metrics.incr_counter("policy.rate_limit.exceeded", 1);
                    return match spec.action {
                        RateLimitSubAction::Drop => Outcome::Drop,
                        RateLimitSubAction::Nxdomain => Outcome::Answer(Answer::nxdomain(false)),
                    };
                }
                // RATE_LIMIT under budget: continue the pipeline exactly as an
                // unmatched rule would. This must not imply Allow's
                // skip-blocklist semantics (§4.1 stage 3: "else continue").
                None => {}
            }
        }

        // Stage 4: local records, authoritative.
        if !self.local_records.is_empty() {
            match self.local_records.resolve(&domain, record_type) {
                LocalLookup::Found(records) => {
                    let ttl = self.local_record_ttl_secs;
                    let mut answer = Answer::noerror(records);
                    answer.cache_as = Some(ttl);
                    answer.authoritative = true;
                    return Outcome::Answer(answer);
                }
                LocalLookup::ChainTooDeep => {
                    return Outcome::Answer(Answer::servfail());
                }
                LocalLookup::Miss => {}
            }
        }

        // Stage 5: cache lookup (done by the caller against raw wire bytes
        // via `query_id`; here we only check presence for routing purposes
        // using a throwaway id since a hit short-circuits before emission).
        if let Some(cached_message) = self.cache.get(&domain, record_type, 0) {
            let mut answer = Answer {
                rcode: cached_message.response_code(),
                records: cached_message.answers().to_vec(),
                blocked: false,
                cached: true,
                upstream: None,
                cache_as: None,
                authoritative: false,
            };
            answer.cached = true;
            return Outcome::Answer(answer);
        }

        // Stage 6: blocklist check.
        if snapshot.blocklist_enabled && !skip_blocklist && self.blocklist.is_blocked(&domain) {
            let mut answer = Answer::nxdomain(true);
            answer.cache_as = Some(self.negative_ttl_secs);
            return Outcome::Answer(answer);
        }

        // Stage 7: conditional forwarding, unless policy already overrode it.
        if forward_override.is_none() && !self.forwarding_eval.is_empty() {
            if let Some(rule) = self.forwarding_eval.evaluate(&domain, client_ip, record_type) {
                forward_override = Some((rule.upstreams.clone(), rule.timeout, rule.failover));
            }
        }

        // Stage 5 missed (we reached stage 7-9 at all): this query is a cache miss.
        self.metrics.incr_counter("dns.queries.cached_miss", 1);

        // Stages 8-9: select upstream list, forward.
        let response = match &forward_override {
            Some((upstreams, timeout, failover)) => {
                let forwarder = UpstreamForwarder::new(upstreams.clone(), *timeout, self.retries)
                    .with_failover(*failover)
                    .with_pool(self.socket_pool.clone());
                forwarder.forward(&domain, &record_type).await
            }
            None => self.forwarder.forward(&domain, &record_type).await,
        };

        match response {
            Ok((upstream, resp)) => {
                self.metrics.incr_counter("dns.queries.forwarded", 1);
                Outcome::Answer(self.answer_from_upstream(upstream, resp))
            }
            Err(err) => {
                warn!(domain = %domain, error = %err, "upstream forward failed");
                self.metrics.incr_counter("dns.queries.errors", 1);
                Outcome::Answer(Answer::servfail())
            }
        }
    }

    /// Stage 10's cacheability decision, applied to a successfully-parsed
    /// upstream response.
    fn answer_from_upstream(&self, upstream: Upstream, resp: DnsResponse) -> Answer {
        let upstream_label: Option<Arc<str>> = Some(Arc::from(upstream.0.to_string().as_str()));
        let truncated = resp.truncated;
        let rcode = resp.rcode;
        let records = resp.message.answers().to_vec();

        let cache_as = if truncated {
            None
        } else if rcode == ResponseCode::NoError {
            Some(resp.min_ttl.unwrap_or(self.negative_ttl_secs))
        } else if rcode == ResponseCode::NXDomain {
            Some(resp.negative_soa_ttl.unwrap_or(self.negative_ttl_secs))
        } else {
            None
        };

        Answer {
            rcode,
            records,
            blocked: false,
            cached: false,
            upstream: upstream_label,
            cache_as,
            authoritative: false,
        }
    }
}

/// Keeps `dns.active_queries` accurate across every return path of
/// `handle_request`, including the early FORMERR return.
struct ActiveQueryGuard<'a> {
    handler: &'a DnsHandler,
}

impl<'a> ActiveQueryGuard<'a> {
    fn enter(handler: &'a DnsHandler) -> Self {
        let count = handler.active_queries.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        handler.metrics.set_gauge("dns.active_queries", count);
        Self { handler }
    }
}

impl Drop for ActiveQueryGuard<'_> {
    fn drop(&mut self) {
        let count = self
            .handler
            .active_queries
            .fetch_sub(1, std::sync::atomic::Ordering::Relaxed)
            - 1;
        self.handler.metrics.set_gauge("dns.active_queries", count);
    }
}

fn synthesize_redirect(domain: &str, record_type: RecordType, target: IpAddr) -> Vec<Record> {
    let Ok(name) = Name::from_str(&format!("{domain}.")) else {
        return Vec::new();
    };
    let rdata = match (record_type, target) {
        (RecordType::A, IpAddr::V4(v4)) => RData::A(hickory_proto::rr::rdata::A(v4)),
        (RecordType::Aaaa, IpAddr::V6(v6)) => RData::AAAA(hickory_proto::rr::rdata::AAAA(v6)),
        // Query type doesn't match the redirect target's address family:
        // answer with an empty NOERROR rather than a type-mismatched record.
        _ => return Vec::new(),
    };
    let mut record = Record::from_rdata(name, 60, rdata);
    record.set_dns_class(hickory_proto::rr::DNSClass::IN);
    vec![record]
}

#[async_trait::async_trait]
impl RequestHandler for DnsHandler {
    async fn handle_request<R: ResponseHandler>(&self, req: &Request, mut response: R) -> ResponseInfo {
        let start = Instant::now();
        let _active_guard = ActiveQueryGuard::enter(self);

        // Stage 1: validate.
        let query = match req.queries().first() {
            Some(q) => q.clone(),
            None => {
                self.metrics.incr_counter("dns.queries.errors", 1);
                let event = QueryEvent {
                    timestamp_unix_ms: Utc::now().timestamp_millis().max(0) as u64,
                    client_ip: req.src().ip(),
                    domain: Arc::from(""),
                    record_type: RecordType::Other(0),
                    rcode: ResponseCode::FormErr as u16,
                    blocked: false,
                    cached: false,
                    elapsed: start.elapsed(),
                    upstream: None,
                };
                if !self.logger.submit(event) {
                    self.metrics.incr_counter("storage.queries.dropped", 1);
                    debug!("query log event dropped, buffer full");
                }
                let msg = MessageResponseBuilder::from_message_request(req)
                    .error_msg(req.header(), ResponseCode::FormErr);
                return response
                    .send_response(msg)
                    .await
                    .unwrap_or_else(|_| ResponseInfo::from(*req.header()));
            }
        };

        let client_ip = req.src().ip();
        let record_type = RecordTypeMapper::from_hickory(query.query_type());
        let domain: Arc<str> = Arc::from(
            query
                .name()
                .to_ascii()
                .trim_end_matches('.')
                .to_ascii_lowercase()
                .as_str(),
        );

        let outcome = self.process(domain.clone(), record_type, client_ip).await;

        let answer = match outcome {
            Outcome::Drop => {
                return ResponseInfo::from(*req.header());
            }
            Outcome::Answer(answer) => answer,
        };

        // Stage 10: cache insert.
        if let Some(ttl) = answer.cache_as {
            let message = build_wire_message(req.id(), answer.rcode, &answer.records);
            self.cache.insert(domain.clone(), record_type, message, ttl);
            self.metrics.set_gauge("cache.size", self.cache.len() as i64);
        }

        // Stage 11: emit response.
        let mut header = *req.header();
        header.set_message_type(MessageType::Response);
        header.set_op_code(OpCode::Query);
        header.set_response_code(answer.rcode);
        header.set_recursion_desired(req.recursion_desired());
        header.set_recursion_available(true);
        header.set_authentic_data(false);
        header.set_authoritative(answer.authoritative);

        let msg = MessageResponseBuilder::from_message_request(req).build(
            header,
            answer.records.iter(),
            iter::empty(),
            iter::empty(),
            iter::empty(),
        );

        let info = response
            .send_response(msg)
            .await
            .unwrap_or_else(|_| ResponseInfo::from(*req.header()));

        // Stage 12: log, async and non-blocking.
        let elapsed = start.elapsed();
        self.metrics.incr_counter("dns.queries.total", 1);
        self.metrics.observe_histogram("dns.query.duration", elapsed.as_secs_f64() * 1000.0);
        if answer.blocked {
            self.metrics.incr_counter("dns.queries.blocked", 1);
        }
        if answer.cached {
            self.metrics.incr_counter("dns.queries.cached_hit", 1);
        }

        let event = QueryEvent {
            timestamp_unix_ms: Utc::now().timestamp_millis().max(0) as u64,
            client_ip,
            domain,
            record_type,
            rcode: answer.rcode as u16,
            blocked: answer.blocked,
            cached: answer.cached,
            elapsed,
            upstream: answer.upstream,
        };
        if !self.logger.submit(event) {
            self.metrics.incr_counter("storage.queries.dropped", 1);
            debug!("query log event dropped, buffer full");
        }

        info
    }
}

fn build_wire_message(id: u16, rcode: ResponseCode, records: &[Record]) -> Message {
    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Response);
    message.set_op_code(OpCode::Query);
    message.set_response_code(rcode);
    message.set_recursion_available(true);
    for record in records {
        message.add_answer(record.clone());
    }
    message
}
