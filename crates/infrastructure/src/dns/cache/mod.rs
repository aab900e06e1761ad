pub mod bloom;
pub mod clock;
pub mod data;
pub mod key;

pub use bloom::AtomicBloom;
pub use clock::{coarse_now_secs, start_clock_ticker};
pub use data::CachedResponse;
pub use key::{BorrowedKey, CacheKey};

use dashmap::DashMap;
use hickory_proto::op::Message;
use sentry_dns_domain::config::CacheConfig;
use sentry_dns_domain::RecordType;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// The response cache (§4.3): a bloom-gated, sharded map of cached DNS
/// responses keyed by `(domain, record_type)`, with TTL expiry and an
/// approximate-LRU sweeper bounding total entries to `max_entries`.
pub struct DnsCache {
    entries: DashMap<CacheKey, Arc<CachedResponse>>,
    bloom: AtomicBloom,
    cfg: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl DnsCache {
    pub fn new(cfg: CacheConfig) -> Self {
        let bloom = AtomicBloom::new(cfg.max_entries.max(1024), 0.01);
        Self {
            entries: DashMap::with_capacity(cfg.max_entries.min(1 << 20)),
            bloom,
            cfg,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Looks up a cached response and, if present and unexpired, emits a
    /// fresh copy with `query_id` substituted and TTLs clamped to what
    /// remains until expiry.
    pub fn get(&self, domain: &str, record_type: RecordType, query_id: u16) -> Option<Message> {
        if !self.bloom.check(domain) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let now = coarse_now_secs();
        let lookup_key = CacheKey::new(Arc::from(domain), record_type);
        match self.entries.get(&lookup_key) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.emit(query_id, now))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts a response. `ttl_secs` must already reflect the caller's
    /// negative/positive TTL decision (§4.1 stage 10); this method only
    /// clamps to the configured min/max bounds for positive answers.
    pub fn insert(&self, domain: Arc<str>, record_type: RecordType, message: Message, ttl_secs: u32) {
        if !self.cfg.enabled {
            return;
        }
        let ttl = if message.answers().is_empty() {
            ttl_secs
        } else {
            self.cfg.clamp_ttl(ttl_secs)
        };

        let now = coarse_now_secs();
        self.bloom.set(&domain);
        let key = CacheKey::new(domain, record_type);
        self.entries
            .insert(key, Arc::new(CachedResponse::new(message, now, ttl)));

        if self.entries.len() > self.cfg.max_entries {
            self.evict_one();
        }
    }

    /// Evicts the least-recently-used entry found in a bounded random
    /// sample, an approximation that avoids maintaining a full LRU list
    /// under concurrent access.
    fn evict_one(&self) {
        const SAMPLE: usize = 8;
        let mut oldest_key: Option<CacheKey> = None;
        let mut oldest_access = u64::MAX;

        for (i, entry) in self.entries.iter().enumerate() {
            if i >= SAMPLE {
                break;
            }
            let last_access = entry.value().last_access_secs.load(Ordering::Relaxed);
            if last_access < oldest_access {
                oldest_access = last_access;
                oldest_key = Some(entry.key().clone());
            }
        }

        if let Some(key) = oldest_key {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Removes expired entries. Run periodically by the sweeper task.
    fn sweep_expired(&self) {
        let now = coarse_now_secs();
        self.entries.retain(|_, v| !v.is_expired(now));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Spawns the periodic sweeper that drops expired entries. Runs alongside
/// the coarse clock ticker started separately at startup.
pub fn start_cache_sweeper(cache: Arc<DnsCache>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    let interval_secs = cache.cfg.sweep_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let before = cache.len();
                    cache.sweep_expired();
                    let removed = before.saturating_sub(cache.len());
                    if removed > 0 {
                        debug!(removed, remaining = cache.len(), "cache sweep removed expired entries");
                    }
                }
            }
        }
    })
}
