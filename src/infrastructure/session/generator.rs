//! Key, secret and client identifier generation

use std::fmt::Debug;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use rand::RngCore;
use uuid::Uuid;

use super::identity::KeyIdentity;

/// Source of fresh identifiers and secrets
///
/// Injected so tests can produce deterministic values.
pub trait KeyGenerator: Send + Sync + Debug {
    /// New key name for `org_id` in the deployment's token format
    fn generate_auth_key(&self, org_id: &str) -> String;

    fn generate_hmac_secret(&self) -> String;

    fn generate_client_id(&self) -> String;

    fn generate_client_secret(&self) -> String;
}

/// Generator backed by UUIDv4 and the thread RNG
#[derive(Debug, Clone)]
pub struct RandomKeyGenerator {
    identity: KeyIdentity,
    secret_bytes: usize,
}

impl RandomKeyGenerator {
    pub fn new(identity: KeyIdentity) -> Self {
        Self {
            identity,
            secret_bytes: 32,
        }
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate_auth_key(&self, org_id: &str) -> String {
        let key_id = Uuid::new_v4().simple().to_string();
        self.identity.generate_token(org_id, &key_id)
    }

    fn generate_hmac_secret(&self) -> String {
        let mut random_bytes = vec![0u8; self.secret_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        URL_SAFE_NO_PAD.encode(&random_bytes)
    }

    fn generate_client_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn generate_client_secret(&self) -> String {
        STANDARD.encode(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
pub use sequential::SequentialKeyGenerator;

#[cfg(test)]
mod sequential {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// Deterministic generator: `key-1`, `key-2`, `client-1`, `secret-1`, ...
    #[derive(Debug, Default)]
    pub struct SequentialKeyGenerator {
        identity: KeyIdentity,
        counter: AtomicU64,
    }

    impl SequentialKeyGenerator {
        pub fn new(identity: KeyIdentity) -> Self {
            Self {
                identity,
                counter: AtomicU64::new(0),
            }
        }

        fn next(&self) -> u64 {
            self.counter.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    impl KeyGenerator for SequentialKeyGenerator {
        fn generate_auth_key(&self, org_id: &str) -> String {
            let key_id = format!("key-{}", self.next());
            self.identity.generate_token(org_id, &key_id)
        }

        fn generate_hmac_secret(&self) -> String {
            format!("hmac-{}", self.next())
        }

        fn generate_client_id(&self) -> String {
            format!("client-{}", self.next())
        }

        fn generate_client_secret(&self) -> String {
            format!("secret-{}", self.next())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::session::identity::{token_org, HashAlgorithm};

    #[test]
    fn test_auth_key_plain_format() {
        let generator = RandomKeyGenerator::new(KeyIdentity::plain());
        let key = generator.generate_auth_key("org1");

        assert!(key.starts_with("org1"));
        assert_eq!(key.len(), "org1".len() + 32);
    }

    #[test]
    fn test_auth_key_new_format() {
        let identity = KeyIdentity::new(true, Some(HashAlgorithm::Sha256), None);
        let generator = RandomKeyGenerator::new(identity);

        let key = generator.generate_auth_key("org1");
        assert_eq!(token_org(&key), Some("org1".to_string()));
    }

    #[test]
    fn test_secrets_are_unique() {
        let generator = RandomKeyGenerator::new(KeyIdentity::plain());

        assert_ne!(generator.generate_hmac_secret(), generator.generate_hmac_secret());
        assert_ne!(generator.generate_client_id(), generator.generate_client_id());
        assert_eq!(generator.generate_client_id().len(), 32);

        let secret = generator.generate_client_secret();
        let decoded = STANDARD.decode(secret).unwrap();
        assert!(Uuid::parse_str(std::str::from_utf8(&decoded).unwrap()).is_ok());
    }

    #[test]
    fn test_sequential_generator() {
        let generator = SequentialKeyGenerator::new(KeyIdentity::plain());

        assert_eq!(generator.generate_auth_key("org1"), "org1key-1");
        assert_eq!(generator.generate_client_id(), "client-2");
        assert_eq!(generator.generate_client_secret(), "secret-3");
    }
}
