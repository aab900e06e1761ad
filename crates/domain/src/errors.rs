use thiserror::Error;

/// Error taxonomy for the query pipeline and its collaborators.
///
/// Every decisional and storage failure the core can produce maps to one
/// variant here; the handler never surfaces a bare `DomainError` to a DNS
/// client, it converts each variant to a `ResponseCode` at the point it is
/// produced.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("pipeline error: {0}")]
    PipelineError(String),

    #[error("upstream network error: {0}")]
    UpstreamNetworkError(String),

    #[error("rate limit exceeded for {bucket_key}")]
    RateLimitExceeded { bucket_key: String },

    #[error("policy evaluation error in rule '{rule}': {reason}")]
    PolicyEvalError { rule: String, reason: String },

    #[error("query log buffer full, event dropped")]
    StorageBufferFull,

    #[error("blocklist update rejected: {0}")]
    BlocklistUpdateRejected(String),

    #[error("query log batch commit failed: {0}")]
    StorageCommitFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<crate::config::ConfigError> for DomainError {
    fn from(err: crate::config::ConfigError) -> Self {
        DomainError::ConfigError(err.to_string())
    }
}
