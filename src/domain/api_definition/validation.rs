//! API definition validation

use thiserror::Error;

use super::ApiDefinition;
use crate::domain::policy::validate_policy_id;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiValidationError {
    #[error("api_id cannot be empty")]
    EmptyId,

    #[error("api_id contains invalid characters")]
    InvalidId,

    #[error("name cannot be empty")]
    EmptyName,

    #[error("listen_path must start with '/'")]
    InvalidListenPath,

    #[error("Request APIID does not match that in Definition! For Update operations these must match.")]
    IdMismatch,
}

impl ApiValidationError {
    /// Rejections of the definition's content, as opposed to the request shape
    pub fn is_semantic(&self) -> bool {
        !matches!(self, Self::IdMismatch)
    }
}

/// Validate an API definition write; `path_id` is the ID from the URL on update
pub fn validate_api_definition(
    def: &ApiDefinition,
    path_id: Option<&str>,
) -> Result<(), ApiValidationError> {
    if let Some(path_id) = path_id {
        if !path_id.is_empty() && path_id != def.api_id {
            return Err(ApiValidationError::IdMismatch);
        }
    }

    if def.api_id.is_empty() {
        return Err(ApiValidationError::EmptyId);
    }

    // Definition IDs are file names, same rules as policies
    validate_policy_id(&def.api_id).map_err(|_| ApiValidationError::InvalidId)?;

    if def.name.trim().is_empty() {
        return Err(ApiValidationError::EmptyName);
    }

    if !def.proxy.listen_path.starts_with('/') {
        return Err(ApiValidationError::InvalidListenPath);
    }

    Ok(())
}
