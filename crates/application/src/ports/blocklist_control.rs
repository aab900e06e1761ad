use async_trait::async_trait;
use sentry_dns_domain::DomainError;

/// Operator-facing control surface over the running blocklist snapshot.
#[async_trait]
pub trait BlocklistControl: Send + Sync {
    /// Re-reads configured sources and installs a new snapshot atomically.
    /// Returns the number of entries in the installed snapshot.
    async fn reload(&self) -> Result<usize, DomainError>;

    /// Entry count in the currently installed snapshot.
    fn size(&self) -> usize;
}
