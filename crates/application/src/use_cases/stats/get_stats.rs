use crate::ports::QueryLogStorage;
use sentry_dns_domain::{DomainError, QueryStats};
use std::sync::Arc;

pub struct GetQueryStatsUseCase {
    storage: Arc<dyn QueryLogStorage>,
}

impl GetQueryStatsUseCase {
    pub fn new(storage: Arc<dyn QueryLogStorage>) -> Self {
        Self { storage }
    }

    pub async fn execute(&self) -> Result<QueryStats, DomainError> {
        self.storage.get_stats().await
    }
}
