use crate::ports::BlocklistControl;
use sentry_dns_domain::DomainError;
use std::sync::Arc;

pub struct ReloadBlocklistUseCase {
    control: Arc<dyn BlocklistControl>,
}

impl ReloadBlocklistUseCase {
    pub fn new(control: Arc<dyn BlocklistControl>) -> Self {
        Self { control }
    }

    pub async fn execute(&self) -> Result<usize, DomainError> {
        self.control.reload().await
    }
}
