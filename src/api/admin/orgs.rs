//! Org-level session endpoints

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ModifyResponse, OrgListResponse};
use crate::domain::SessionState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrgQuery {
    pub reset_quota: String,
    pub filter: String,
}

impl OrgQuery {
    fn reset_quota(&self) -> bool {
        self.reset_quota == "1"
    }
}

pub async fn list_orgs(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<OrgQuery>,
) -> Result<Json<OrgListResponse>, ApiError> {
    let keys = state.orgs.list(&query.filter).await?;
    Ok(Json(OrgListResponse { keys }))
}

pub async fn get_org(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(org_id): Path<String>,
) -> Result<Json<SessionState>, ApiError> {
    Ok(Json(state.orgs.get(&org_id).await?))
}

pub async fn create_org(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(org_id): Path<String>,
    Query(query): Query<OrgQuery>,
    Json(session): Json<SessionState>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let change = state
        .orgs
        .add_or_update(&org_id, session, true, query.reset_quota())
        .await?;
    Ok(Json(change.into()))
}

pub async fn update_org(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(org_id): Path<String>,
    Query(query): Query<OrgQuery>,
    Json(session): Json<SessionState>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let change = state
        .orgs
        .add_or_update(&org_id, session, false, query.reset_quota())
        .await?;
    Ok(Json(change.into()))
}

pub async fn delete_org(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(org_id): Path<String>,
) -> Result<Json<ModifyResponse>, ApiError> {
    Ok(Json(state.orgs.delete(&org_id).await?.into()))
}
