use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

/// Operator-facing surface (§8): `/health`, `/api/stats`,
/// `/api/blocklist/reload`. Dashboards, group management, client ARP
/// sync, and the Pi-hole importer are out-of-core collaborators and have
/// no routes here.
pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/blocklist/reload", post(handlers::reload_blocklist))
        .with_state(state)
}
