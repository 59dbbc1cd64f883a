//! Infrastructure layer - store, bus, registry and session implementations

pub mod kv;
pub mod logging;
pub mod notifier;
pub mod oauth;
pub mod policy;
pub mod registry;
pub mod session;
