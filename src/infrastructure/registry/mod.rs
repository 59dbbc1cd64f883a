//! API/policy registry, its reload protocol and file persistence

mod config_registry;
mod definitions;
mod reload;

pub use config_registry::ConfigRegistry;
pub use definitions::{DefinitionStore, WriteMode};
pub use reload::{DefinitionSource, ReloadCallback, ReloadCoordinator, ReloadState};
