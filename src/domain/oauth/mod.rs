//! OAuth client domain

mod entity;

pub use entity::{AccessToken, ClientToken, OAuthClient, RefreshToken, TokenTypeHint};
