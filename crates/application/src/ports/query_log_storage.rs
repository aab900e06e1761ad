use async_trait::async_trait;
use sentry_dns_domain::{DomainError, QueryEvent, QueryLogFilter, QueryStats};

/// Persistence boundary for recorded query events.
///
/// Implementations own batching and durability; callers treat logging as
/// best-effort and never block DNS resolution on it.
#[async_trait]
pub trait QueryLogStorage: Send + Sync {
    async fn log_query(&self, event: &QueryEvent) -> Result<(), DomainError>;

    async fn log_query_batch(&self, events: &[QueryEvent]) -> Result<(), DomainError>;

    async fn get_recent(&self, filter: &QueryLogFilter) -> Result<Vec<QueryEvent>, DomainError>;

    async fn get_stats(&self) -> Result<QueryStats, DomainError>;

    async fn cleanup(&self, retention_days: u32) -> Result<u64, DomainError>;

    async fn close(&self);
}
