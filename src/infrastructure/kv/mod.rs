//! Backing store implementations

mod in_memory;
mod prefixed;
mod redis;

pub use in_memory::InMemoryStore;
pub use prefixed::PrefixedStore;
pub use redis::{RedisStore, RedisStoreConfig};
