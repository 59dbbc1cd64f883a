//! API definition domain

mod entity;
mod validation;

pub use entity::{ApiDefinition, ProxyConfig, OAS_EXTENSION};
pub use validation::{validate_api_definition, ApiValidationError};
