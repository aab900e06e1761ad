use sentry_dns_application::use_cases::{GetQueryStatsUseCase, ReloadBlocklistUseCase};
use std::sync::Arc;

/// Shared state for the operator-facing HTTP surface (§8): handlers only
/// call into the application-layer ports, never into core internals
/// directly.
#[derive(Clone)]
pub struct AppState {
    pub get_stats: Arc<GetQueryStatsUseCase>,
    pub reload_blocklist: Arc<ReloadBlocklistUseCase>,
}
