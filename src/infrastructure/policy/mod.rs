//! Policy application

mod applier;

pub use applier::{reset_api_limits, PolicyApplier};
