//! Domain layer - Core entities and the seams to external collaborators

pub mod api_definition;
pub mod error;
pub mod notification;
pub mod oauth;
pub mod policy;
pub mod session;
pub mod storage;

pub use api_definition::{validate_api_definition, ApiDefinition, ApiValidationError, ProxyConfig};
pub use error::DomainError;
pub use notification::{Notification, NotificationBus, NotificationCommand, NotificationStream};
pub use oauth::{AccessToken, ClientToken, OAuthClient, RefreshToken, TokenTypeHint};
pub use policy::{validate_policy, Policy, PolicyPartitions, PolicyValidationError};
pub use session::{
    AccessDefinition, ApiLimit, BasicAuthData, HashType, KeyAction, KeyChange, KeyRequestContext,
    KeyWriteMode, SessionState,
};
pub use storage::{KeyValueStore, KeyValueStoreExt};
