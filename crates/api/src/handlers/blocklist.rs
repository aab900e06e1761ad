use crate::{dto::BlocklistReloadResponse, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info, instrument};

/// Triggers an immediate re-read+re-install of the blocklist snapshot
/// (§4.2, same path the periodic sync job takes).
#[instrument(skip(state), name = "api_reload_blocklist")]
pub async fn reload_blocklist(
    State(state): State<AppState>,
) -> (StatusCode, Json<BlocklistReloadResponse>) {
    match state.reload_blocklist.execute().await {
        Ok(size) => {
            info!(size, "blocklist reloaded via API");
            (
                StatusCode::OK,
                Json(BlocklistReloadResponse {
                    success: true,
                    size,
                    error: None,
                }),
            )
        }
        Err(e) => {
            error!(error = %e, "blocklist reload failed via API");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(BlocklistReloadResponse {
                    success: false,
                    size: 0,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
