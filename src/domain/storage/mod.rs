//! Storage domain - backing key-value store abstraction

mod repository;

pub use repository::{score_bound, KeyValueStore, KeyValueStoreExt};
