use crate::{dto::StatsResponse, state::AppState};
use axum::{extract::State, Json};
use tracing::{debug, error, instrument};

#[instrument(skip(state), name = "api_get_stats")]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    debug!("Fetching query statistics");

    match state.get_stats.execute().await {
        Ok(stats) => {
            debug!(total = stats.total, blocked = stats.blocked, "statistics retrieved");
            Json(StatsResponse::from(stats))
        }
        Err(e) => {
            error!(error = %e, "failed to retrieve statistics");
            Json(StatsResponse::default())
        }
    }
}
