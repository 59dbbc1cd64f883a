//! Policy validation

use thiserror::Error;

use super::Policy;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyValidationError {
    #[error("Policy ID cannot be empty")]
    EmptyId,

    #[error("Policy ID contains invalid character: '{0}'")]
    InvalidCharacter(char),

    #[error("Request ID does not match that in policy! For Update operations these must match.")]
    IdMismatch,
}

/// Policy IDs double as file names, so path separators are rejected
pub fn validate_policy_id(id: &str) -> Result<(), PolicyValidationError> {
    if id.is_empty() {
        return Err(PolicyValidationError::EmptyId);
    }

    if let Some(c) = id.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(PolicyValidationError::InvalidCharacter(c));
    }

    if id == "." || id == ".." {
        return Err(PolicyValidationError::InvalidCharacter('.'));
    }

    Ok(())
}

/// Validate a policy write; `path_id` is the ID from the URL on update
pub fn validate_policy(policy: &Policy, path_id: Option<&str>) -> Result<(), PolicyValidationError> {
    if let Some(path_id) = path_id {
        if !path_id.is_empty() && path_id != policy.id {
            return Err(PolicyValidationError::IdMismatch);
        }
    }

    validate_policy_id(&policy.id)
}
