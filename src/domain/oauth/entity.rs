//! OAuth client and token records

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An application allowed to obtain tokens for one or more APIs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthClient {
    pub client_id: String,
    pub secret: String,
    pub redirect_uri: String,
    pub policy_id: String,
    pub meta_data: Value,
    pub description: String,
}

impl OAuthClient {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
            meta_data: Value::Null,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = policy_id.into();
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// The policy moved away from a previously set one
    pub fn policy_changed_from(&self, previous: &OAuthClient) -> bool {
        !previous.policy_id.is_empty() && previous.policy_id != self.policy_id
    }
}

/// Opaque access token record bound to one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    /// Unix seconds
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Refresh token record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub client_id: String,
    pub access_token: String,
}

/// A live token as shown in client token listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientToken {
    #[serde(rename = "code")]
    pub token: String,
    pub expires: i64,
}

/// Which kind of token a revocation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    /// Unknown or empty hints mean "try both"
    pub fn parse(hint: &str) -> Option<Self> {
        match hint {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_change_detection() {
        let previous = OAuthClient::new("c1", "s1").with_policy("p1");
        let same = previous.clone();
        let moved = previous.clone().with_policy("p2");

        assert!(!same.policy_changed_from(&previous));
        assert!(moved.policy_changed_from(&previous));

        let unset = OAuthClient::new("c1", "s1");
        assert!(!moved.policy_changed_from(&unset));
    }

    #[test]
    fn test_token_hint() {
        assert_eq!(TokenTypeHint::parse("access_token"), Some(TokenTypeHint::AccessToken));
        assert_eq!(TokenTypeHint::parse("refresh_token"), Some(TokenTypeHint::RefreshToken));
        assert_eq!(TokenTypeHint::parse(""), None);
    }

    #[test]
    fn test_client_token_wire_name() {
        let token = ClientToken {
            token: "abc".to_string(),
            expires: 10,
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["code"], "abc");
    }
}
