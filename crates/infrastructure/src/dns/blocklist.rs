use arc_swap::ArcSwap;
use async_trait::async_trait;
use fancy_regex::Regex;
use sentry_dns_application::ports::{BlocklistControl, MetricsSink};
use sentry_dns_domain::{parse_list_text, BlocklistSnapshot, DomainError, ParsedEntry};
use std::sync::Arc;
use tracing::warn;

/// Builds a snapshot from parsed block entries plus a raw allowlist
/// (`blocking.whitelist` config entries, `*.`-prefixed for a suffix match).
pub fn build_snapshot(block_entries: Vec<ParsedEntry>, whitelist: &[String]) -> BlocklistSnapshot {
    let mut snapshot = BlocklistSnapshot::from_entries(block_entries);
    for raw in whitelist {
        if let Some(suffix) = raw.strip_prefix("*.") {
            snapshot.allow_wildcard_suffix.insert(suffix.to_string());
        } else {
            snapshot.allow_exact.insert(raw.clone());
        }
    }
    snapshot
}

/// Runtime holder for the active blocklist snapshot (§4.2). Readers take an
/// uncontended `Arc` load on every query; updates (manual reload or the
/// periodic sync job) install a brand new snapshot atomically so no reader
/// ever observes a partially-updated set.
pub struct BlocklistManager {
    snapshot: ArcSwap<BlocklistSnapshot>,
    compiled_patterns: ArcSwap<Vec<Regex>>,
    sources: Vec<String>,
    custom_blocked: Vec<String>,
    whitelist: Vec<String>,
    reject_empty_update: bool,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl BlocklistManager {
    pub fn new(initial: BlocklistSnapshot) -> Self {
        let compiled = compile_patterns(&initial);
        Self {
            snapshot: ArcSwap::from_pointee(initial),
            compiled_patterns: ArcSwap::from_pointee(compiled),
            sources: Vec::new(),
            custom_blocked: Vec::new(),
            whitelist: Vec::new(),
            reject_empty_update: true,
            metrics: None,
        }
    }

    /// Attaches the reload-time inputs (§4.2): local file paths the
    /// download collaborator drops raw list bytes at, plus the
    /// config-carried custom-blocked/whitelist entries and the
    /// empty-update rejection policy.
    pub fn with_reload_sources(
        mut self,
        sources: Vec<String>,
        custom_blocked: Vec<String>,
        whitelist: Vec<String>,
        reject_empty_update: bool,
    ) -> Self {
        self.sources = sources;
        self.custom_blocked = custom_blocked;
        self.whitelist = whitelist;
        self.reject_empty_update = reject_empty_update;
        self
    }

    /// Attaches the sink `blocklist.update.applied`/`blocklist.update.rejected`
    /// and `blocklist.size` are reported to (§6.4).
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn update(&self, snapshot: BlocklistSnapshot) {
        let compiled = compile_patterns(&snapshot);
        self.snapshot.store(Arc::new(snapshot));
        self.compiled_patterns.store(Arc::new(compiled));
    }

    pub fn size(&self) -> usize {
        self.snapshot.load().total_len()
    }

    /// Whether `domain` (already normalized) is blocked: the allowlist
    /// takes priority over every block rule, per §4.2's stated order.
    pub fn is_blocked(&self, domain: &str) -> bool {
        let snapshot = self.snapshot.load();

        if snapshot.allow_exact.contains(domain) || matches_suffix(&snapshot.allow_wildcard_suffix, domain) {
            return false;
        }

        if snapshot.exact.contains(domain) {
            return true;
        }
        if matches_suffix(&snapshot.wildcard_suffix, domain) {
            return true;
        }
        if matches_prefix(&snapshot.wildcard_prefix, domain) {
            return true;
        }

        let patterns = self.compiled_patterns.load();
        patterns.iter().any(|re| re.is_match(domain).unwrap_or(false))
    }
}

#[async_trait]
impl BlocklistControl for BlocklistManager {
    /// Re-reads each configured source file plus the static custom-blocked
    /// list, reinstalls a fresh snapshot, and rejects the update if it
    /// would collapse a non-empty set to zero entries (§4.2, unless
    /// `reject_empty_update` is disabled).
    async fn reload(&self) -> Result<usize, DomainError> {
        let mut entries = Vec::new();
        let mut skipped_total = 0usize;

        for path in &self.sources {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    let (parsed, skipped) = parse_list_text(&text);
                    skipped_total += skipped;
                    entries.extend(parsed);
                }
                Err(err) => {
                    warn!(path, error = %err, "blocklist source unreadable, skipping");
                }
            }
        }

        let (custom_parsed, custom_skipped) =
            parse_list_text(&self.custom_blocked.join("\n"));
        entries.extend(custom_parsed);
        skipped_total += custom_skipped;

        let snapshot = build_snapshot(entries, &self.whitelist);
        let new_len = snapshot.total_len();

        if self.reject_empty_update && new_len == 0 && self.size() > 0 {
            warn!("blocklist reload produced zero entries, rejecting update");
            if let Some(metrics) = &self.metrics {
                metrics.incr_counter("blocklist.update.rejected", 1);
            }
            return Err(DomainError::BlocklistUpdateRejected(
                "reload produced an empty snapshot".into(),
            ));
        }

        if skipped_total > 0 {
            warn!(skipped = skipped_total, "blocklist reload skipped invalid lines");
        }

        self.update(snapshot);
        if let Some(metrics) = &self.metrics {
            metrics.incr_counter("blocklist.update.applied", 1);
            metrics.set_gauge("blocklist.size", new_len as i64);
        }
        Ok(new_len)
    }

    fn size(&self) -> usize {
        self.snapshot.load().total_len()
    }
}

fn compile_patterns(snapshot: &BlocklistSnapshot) -> Vec<Regex> {
    snapshot
        .patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

fn matches_suffix(set: &std::collections::HashSet<String>, domain: &str) -> bool {
    let mut rest = domain;
    loop {
        if set.contains(rest) {
            return true;
        }
        match rest.split_once('.') {
            Some((_, tail)) => rest = tail,
            None => return false,
        }
    }
}

fn matches_prefix(set: &std::collections::HashSet<String>, domain: &str) -> bool {
    set.iter().any(|prefix| domain.starts_with(prefix.as_str()))
}
