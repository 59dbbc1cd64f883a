//! Policy definition endpoints
//!
//! Writes go to the policy directory only; the registry picks them up on
//! the next reload.

use axum::extract::{Path, State};
use tracing::{debug, error};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ModifyResponse};
use crate::domain::policy::validate_policy_id;
use crate::domain::{validate_policy, KeyAction, KeyChange, Policy};

pub async fn list_policies(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Json<Vec<Policy>> {
    debug!("Requesting policy list");
    let policies = state
        .registry
        .policies()
        .iter()
        .map(|policy| policy.as_ref().clone())
        .collect();
    Json(policies)
}

pub async fn get_policy(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(policy_id): Path<String>,
) -> Result<Json<Policy>, ApiError> {
    let policy = state.registry.policy(&policy_id).ok_or_else(|| {
        error!(policy_id = %policy_id, "Policy doesn't exist");
        ApiError::not_found("Policy not found")
    })?;

    Ok(Json(policy.as_ref().clone()))
}

pub async fn create_policy(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(policy): Json<Policy>,
) -> Result<Json<ModifyResponse>, ApiError> {
    save_policy(&state, policy, None).await
}

pub async fn update_policy(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(policy_id): Path<String>,
    Json(policy): Json<Policy>,
) -> Result<Json<ModifyResponse>, ApiError> {
    save_policy(&state, policy, Some(&policy_id)).await
}

async fn save_policy(
    state: &AppState,
    policy: Policy,
    path_id: Option<&str>,
) -> Result<Json<ModifyResponse>, ApiError> {
    validate_policy(&policy, path_id).map_err(|e| {
        error!(error = %e, "Rejected policy write");
        ApiError::bad_request(e.to_string())
    })?;

    state.definitions.write_policy(&policy).await?;

    let action = if path_id.is_some() {
        KeyAction::Modified
    } else {
        KeyAction::Added
    };
    Ok(Json(KeyChange::new(policy.id, action).into()))
}

pub async fn delete_policy(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(policy_id): Path<String>,
) -> Result<Json<ModifyResponse>, ApiError> {
    validate_policy_id(&policy_id).map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.definitions.delete_policy(&policy_id).await?;
    Ok(Json(KeyChange::new(policy_id, KeyAction::Deleted).into()))
}
