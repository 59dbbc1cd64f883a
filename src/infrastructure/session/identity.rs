//! Key identity: token format, key hashing and hash resolution order

use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::domain::DomainError;

/// Digest used to address sessions by hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Lowercase hex digest of `input`
    pub fn digest(&self, input: &str) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
            Self::Sha512 => hex::encode(Sha512::digest(input.as_bytes())),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(DomainError::configuration(format!(
                "Unsupported hash function '{}'",
                other
            ))),
        }
    }
}

/// One way of turning a key name into its storage address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy {
    /// The configured (or token-embedded) algorithm
    Current,
    /// Algorithm keys were issued under before the current one
    Legacy(HashAlgorithm),
}

/// Payload of a new-format token
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
    org: String,
    id: String,
    h: String,
}

fn decode_token(token: &str) -> Option<TokenPayload> {
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Org embedded in a new-format token
pub fn token_org(token: &str) -> Option<String> {
    decode_token(token).map(|payload| payload.org)
}

/// Hash function embedded in a new-format token
pub fn token_hash_function(token: &str) -> Option<HashAlgorithm> {
    decode_token(token).and_then(|payload| payload.h.parse().ok())
}

/// Prefix shared by every new-format token of `org_id`, for key listing
///
/// Only characters fully determined by the encoded org are kept, so the
/// prefix also matches tokens of other orgs sharing most of the name
/// ("org1" vs "org12", often "org2" too). Callers confirm with `token_org`.
pub fn token_org_prefix(org_id: &str) -> String {
    let head = format!(r#"{{"org":"{}""#, org_id);
    let encoded = URL_SAFE_NO_PAD.encode(&head);
    let keep = head.len() * 4 / 3;
    encoded[..keep.min(encoded.len())].to_string()
}

/// Token format and hashing rules for one deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIdentity {
    hash_keys: bool,
    function: Option<HashAlgorithm>,
    legacy: Option<HashAlgorithm>,
}

impl Default for KeyIdentity {
    fn default() -> Self {
        Self::plain()
    }
}

impl KeyIdentity {
    pub fn new(hash_keys: bool, function: Option<HashAlgorithm>, legacy: Option<HashAlgorithm>) -> Self {
        Self {
            hash_keys,
            function,
            legacy,
        }
    }

    /// Keys stored and looked up verbatim
    pub fn plain() -> Self {
        Self::new(false, None, None)
    }

    pub fn hashes_keys(&self) -> bool {
        self.hash_keys
    }

    pub fn hash_function(&self) -> Option<HashAlgorithm> {
        self.function
    }

    /// Build a key name for `key_id` under `org_id`
    ///
    /// With a hash function configured this is the self-describing format
    /// carrying org, id and hash function; otherwise org and id concatenated.
    pub fn generate_token(&self, org_id: &str, key_id: &str) -> String {
        match self.function {
            Some(function) => {
                let payload = TokenPayload {
                    org: org_id.to_string(),
                    id: key_id.to_string(),
                    h: function.name().to_string(),
                };
                // Serializing three strings cannot fail
                let json = serde_json::to_vec(&payload).unwrap_or_default();
                URL_SAFE_NO_PAD.encode(json)
            }
            None => format!("{}{}", org_id, key_id),
        }
    }

    /// Storage address of `key` under the current strategy
    pub fn hash_key(&self, key: &str) -> String {
        if !self.hash_keys {
            return key.to_string();
        }

        let function = token_hash_function(key)
            .or(self.function)
            .unwrap_or(HashAlgorithm::Sha256);
        function.digest(key)
    }

    /// Lookup order; first hit wins
    pub fn strategies(&self) -> Vec<HashStrategy> {
        let mut strategies = vec![HashStrategy::Current];

        if self.hash_keys {
            if let Some(legacy) = self.legacy {
                strategies.push(HashStrategy::Legacy(legacy));
            }
        }

        strategies
    }

    pub fn resolve(&self, strategy: HashStrategy, key: &str) -> String {
        match strategy {
            HashStrategy::Current => self.hash_key(key),
            HashStrategy::Legacy(function) => function.digest(key),
        }
    }
}
