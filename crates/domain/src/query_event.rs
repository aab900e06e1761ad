use crate::dns_query::RecordType;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// A single query outcome, produced by the handler at the end of every
/// query (§3 QueryEvent) and handed to the async logger. Kept small and
/// `Clone`-cheap (domain is `Arc<str>`) since it crosses a channel on
/// every query.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub timestamp_unix_ms: u64,
    pub client_ip: IpAddr,
    pub domain: Arc<str>,
    pub record_type: RecordType,
    pub rcode: u16,
    pub blocked: bool,
    pub cached: bool,
    pub elapsed: Duration,
    pub upstream: Option<Arc<str>>,
}

impl QueryEvent {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// Filter accepted by `Storage::get_recent` (§6.3).
#[derive(Debug, Clone, Default)]
pub struct QueryLogFilter {
    pub domain_contains: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub blocked_only: bool,
    pub limit: usize,
}

/// Aggregate stats returned by `Storage::get_stats` (§6.3).
#[derive(Debug, Clone, Default)]
pub struct QueryStats {
    pub total: u64,
    pub blocked: u64,
    pub forwarded: u64,
    pub cached_hit: u64,
    pub cached_miss: u64,
    pub errors: u64,
    pub top_domains: Vec<(String, u64)>,
}
