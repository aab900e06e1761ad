use sentry_dns_domain::QueryStats;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Default)]
pub struct StatsResponse {
    pub total: u64,
    pub blocked: u64,
    pub forwarded: u64,
    pub cached_hit: u64,
    pub cached_miss: u64,
    pub errors: u64,
    pub top_domains: Vec<(String, u64)>,
}

impl From<QueryStats> for StatsResponse {
    fn from(stats: QueryStats) -> Self {
        Self {
            total: stats.total,
            blocked: stats.blocked,
            forwarded: stats.forwarded,
            cached_hit: stats.cached_hit,
            cached_miss: stats.cached_miss,
            errors: stats.errors,
            top_domains: stats.top_domains,
        }
    }
}
