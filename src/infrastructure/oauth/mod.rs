//! OAuth client registry and per-API token storage

mod service;
mod storage;

pub use service::{ClientRegistration, ClientUpdate, OAuthClientRegistry, Pagination, TokenPage};
pub use storage::{storage_prefix, OAuthStorage, TOKENS_PAGE_SIZE};
