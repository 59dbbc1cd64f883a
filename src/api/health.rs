//! Liveness and readiness probes; no admin secret required

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Pass,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Backing store reachable and definitions loaded
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let store = match state.store.exists("health-probe").await {
        Ok(_) => HealthCheck {
            name: "store".to_string(),
            status: HealthStatus::Pass,
            message: None,
        },
        Err(e) => HealthCheck {
            name: "store".to_string(),
            status: HealthStatus::Fail,
            message: Some(e.to_string()),
        },
    };

    let registry = if state.registry.generation() > 0 {
        HealthCheck {
            name: "registry".to_string(),
            status: HealthStatus::Pass,
            message: None,
        }
    } else {
        HealthCheck {
            name: "registry".to_string(),
            status: HealthStatus::Warn,
            message: Some("definitions not loaded yet".to_string()),
        }
    };

    let overall = if store.status == HealthStatus::Fail {
        HealthStatus::Fail
    } else {
        registry.status
    };
    let code = if overall == HealthStatus::Fail {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let response = HealthResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![store, registry]),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    (code, Json(response))
}
