//! Shared-secret guard for the admin API

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Header carrying the admin shared secret
pub const ADMIN_SECRET_HEADER: &str = "x-gateway-authorization";

/// Extractor that requires the configured admin secret
///
/// An empty configured secret locks the admin API entirely.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if state.admin_secret.is_empty() || !secrets_match(presented, &state.admin_secret) {
            warn!(
                path = %parts.uri.path(),
                "Attempted administrative access with invalid or missing key!"
            );
            return Err(ApiError::forbidden());
        }

        Ok(RequireAdmin)
    }
}

/// Compare without bailing out at the first differing byte
fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();

    if presented.len() != expected.len() {
        return false;
    }

    presented
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
