//! Hot reload endpoints

use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, StatusMessage};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReloadQuery {
    pub block: String,
}

/// Queue a local reload; `?block=true` waits for the swap
pub async fn reload(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ReloadQuery>,
) -> Result<Json<StatusMessage>, ApiError> {
    if query.block == "true" {
        state.reload.reload_blocking().await?;
    } else {
        state.reload.reload(None);
    }

    info!("Reload URL Structure - Scheduled");
    Ok(Json(StatusMessage::ok("")))
}

/// Ask every node, this one included, to reload
pub async fn group_reload(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<StatusMessage>, ApiError> {
    info!(status = "ok", "Group reload accepted");
    state.reload.group_reload().await?;

    Ok(Json(StatusMessage::ok("")))
}
