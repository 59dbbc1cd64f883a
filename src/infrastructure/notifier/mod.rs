//! Notification bus implementations and the local listener

mod in_memory;
mod listener;
mod redis;

pub use in_memory::InMemoryBus;
pub use listener::NotificationListener;
pub use redis::{RedisBus, DEFAULT_CHANNEL};
