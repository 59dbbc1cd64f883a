//! Policy domain

mod entity;
mod validation;

pub use entity::{Policy, PolicyPartitions};
pub use validation::{validate_policy, validate_policy_id, PolicyValidationError};
