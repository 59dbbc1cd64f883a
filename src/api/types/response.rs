//! Success bodies of the admin API

use serde::{Deserialize, Serialize};

use crate::domain::KeyChange;

/// `{key, status, action[, key_hash]}` returned by every key-like mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyResponse {
    pub key: String,
    pub status: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hash: Option<String>,
}

impl ModifyResponse {
    pub fn ok(key: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: "ok".to_string(),
            action: action.into(),
            key_hash: None,
        }
    }
}

impl From<KeyChange> for ModifyResponse {
    fn from(change: KeyChange) -> Self {
        Self {
            key: change.key,
            status: "ok".to_string(),
            action: change.action.as_str().to_string(),
            key_hash: change.key_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyListResponse {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgListResponse {
    pub keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KeyAction;

    #[test]
    fn test_key_hash_omitted_when_absent() {
        let body = serde_json::to_value(ModifyResponse::from(KeyChange::new(
            "abc",
            KeyAction::Added,
        )))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"key": "abc", "status": "ok", "action": "added"})
        );

        let body = serde_json::to_value(ModifyResponse::from(
            KeyChange::new("abc", KeyAction::Added).with_hash("f00"),
        ))
        .unwrap();
        assert_eq!(body["key_hash"], "f00");
    }
}
