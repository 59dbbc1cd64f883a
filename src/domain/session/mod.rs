//! Session (key) domain types

mod context;
mod entity;

pub use context::{KeyAction, KeyChange, KeyRequestContext, KeyWriteMode};
pub use entity::{AccessDefinition, ApiLimit, BasicAuthData, HashType, SessionState};
