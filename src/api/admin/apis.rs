//! API definition endpoints
//!
//! Every definition is stored twice: the plain document and its OAS
//! companion carrying the definition under the gateway extension.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ModifyResponse};
use crate::domain::api_definition::OAS_EXTENSION;
use crate::domain::policy::validate_policy_id;
use crate::domain::{
    validate_api_definition, ApiDefinition, ApiValidationError, KeyAction, KeyChange,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiQuery {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ApiQuery {
    fn is_oas(&self) -> bool {
        self.kind == "oas"
    }
}

pub async fn list_apis(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Json<Vec<ApiDefinition>> {
    debug!("Requesting API list");
    let apis = state
        .registry
        .apis()
        .iter()
        .map(|api| api.as_ref().clone())
        .collect();
    Json(apis)
}

pub async fn get_api(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(api_id): Path<String>,
    Query(query): Query<ApiQuery>,
) -> Result<Json<Value>, ApiError> {
    let api = state.registry.api(&api_id).ok_or_else(|| {
        error!(api_id = %api_id, "API doesn't exist");
        ApiError::not_found("API not found")
    })?;

    if query.is_oas() {
        let stored = state.definitions.read_api_oas(&api_id).await?;
        let document = api
            .to_oas(stored)
            .map_err(|_| ApiError::internal("Marshalling failed"))?;
        return Ok(Json(document));
    }

    let document =
        serde_json::to_value(api.as_ref()).map_err(|_| ApiError::internal("Marshalling failed"))?;
    Ok(Json(document))
}

pub async fn create_api(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ApiQuery>,
    Json(body): Json<Value>,
) -> Result<Json<ModifyResponse>, ApiError> {
    save_api(&state, body, query.is_oas(), None).await
}

pub async fn update_api(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(api_id): Path<String>,
    Query(query): Query<ApiQuery>,
    Json(body): Json<Value>,
) -> Result<Json<ModifyResponse>, ApiError> {
    save_api(&state, body, query.is_oas(), Some(&api_id)).await
}

/// Split a request body into the definition and the OAS document to store
async fn decode_definition(
    state: &AppState,
    body: Value,
    oas_typed: bool,
) -> Result<(ApiDefinition, Value), ApiError> {
    if oas_typed {
        let def = match ApiDefinition::from_oas(&body) {
            Some(Ok(def)) => def,
            Some(Err(_)) => {
                return Err(ApiError::bad_request(format!(
                    "Couldn't unmarshal {} extension in the document",
                    OAS_EXTENSION
                )));
            }
            None => {
                return Err(ApiError::bad_request(format!(
                    "Couldn't find {} extension in the document",
                    OAS_EXTENSION
                )));
            }
        };
        return Ok((def, body));
    }

    let def: ApiDefinition = serde_json::from_value(body).map_err(|e| {
        error!(error = %e, "Couldn't decode new API Definition object");
        ApiError::bad_request("Request malformed")
    })?;

    // Keep whatever the stored companion already documents
    let existing = if validate_policy_id(&def.api_id).is_ok() {
        state.definitions.read_api_oas(&def.api_id).await?
    } else {
        None
    };
    let oas = def
        .to_oas(existing)
        .map_err(|_| ApiError::internal("Marshalling failed"))?;

    Ok((def, oas))
}

async fn save_api(
    state: &AppState,
    body: Value,
    oas_typed: bool,
    path_id: Option<&str>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let (def, oas) = decode_definition(state, body, oas_typed).await?;

    validate_api_definition(&def, path_id).map_err(|e| match e {
        ApiValidationError::IdMismatch => {
            error!("PUT operation on different APIIDs");
            ApiError::bad_request(e.to_string())
        }
        semantic => {
            debug!(reason = %semantic, "Semantic validation for API Definition failed");
            ApiError::bad_request(format!(
                "Validation of API Definition failed. Reason: {}.",
                semantic
            ))
        }
    })?;

    state.definitions.write_api(&def).await?;
    state.definitions.write_api_oas(&def.api_id, &oas).await?;

    let action = if path_id.is_some() {
        KeyAction::Modified
    } else {
        KeyAction::Added
    };
    Ok(Json(KeyChange::new(def.api_id, action).into()))
}

pub async fn delete_api(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(api_id): Path<String>,
) -> Result<Json<ModifyResponse>, ApiError> {
    validate_policy_id(&api_id).map_err(|_| ApiError::bad_request("Invalid API ID"))?;

    state.definitions.delete_api(&api_id).await?;
    Ok(Json(KeyChange::new(api_id, KeyAction::Deleted).into()))
}
