//! Basic-auth password hashing using Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as Argon2PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::fmt::Debug;
use tracing::error;

use crate::domain::session::{BasicAuthData, HashType};
use crate::domain::DomainError;

/// Trait for password hashing operations
pub trait PasswordHasher: Send + Sync + Debug {
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    fn verify(&self, password: &str, hash: &str) -> bool;

    /// Encoding recorded next to hashes this hasher produces
    fn hash_type(&self) -> HashType;
}

/// Argon2-based password hasher
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn hash_type(&self) -> HashType {
        HashType::Argon2
    }
}

/// Replace the plaintext password in `data` with its hash
///
/// A hashing failure leaves the password in plaintext and says so in
/// `hash_type`, so the key stays usable.
pub fn hash_basic_auth_password(hasher: &dyn PasswordHasher, data: &mut BasicAuthData) {
    match hasher.hash(&data.password) {
        Ok(hash) => {
            data.password = hash;
            data.hash_type = hasher.hash_type();
        }
        Err(e) => {
            error!(error = %e, "Could not hash password, storing plaintext");
            data.hash_type = HashType::Plaintext;
        }
    }
}

/// Check a login attempt against stored basic-auth data
pub fn verify_basic_auth_password(hasher: &dyn PasswordHasher, data: &BasicAuthData, attempt: &str) -> bool {
    match data.hash_type {
        HashType::Plaintext => data.password == attempt,
        HashType::Argon2 => hasher.verify(attempt, &data.password),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FailingHasher;

    impl PasswordHasher for FailingHasher {
        fn hash(&self, _password: &str) -> Result<String, DomainError> {
            Err(DomainError::internal("boom"))
        }

        fn verify(&self, _password: &str, _hash: &str) -> bool {
            false
        }

        fn hash_type(&self) -> HashType {
            HashType::Argon2
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("my_secure_password").unwrap();

        assert!(hasher.verify("my_secure_password", &hash));
        assert!(!hasher.verify("wrong_password", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = Argon2Hasher::new();

        let hash1 = hasher.hash("password").unwrap();
        let hash2 = hasher.hash("password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_invalid_hash() {
        let hasher = Argon2Hasher::new();
        assert!(!hasher.verify("password", "invalid_hash_format"));
    }

    #[test]
    fn test_hash_basic_auth_password() {
        let hasher = Argon2Hasher::new();
        let mut data = BasicAuthData {
            password: "hunter2".to_string(),
            hash_type: HashType::Plaintext,
        };

        hash_basic_auth_password(&hasher, &mut data);

        assert_eq!(data.hash_type, HashType::Argon2);
        assert_ne!(data.password, "hunter2");
        assert!(verify_basic_auth_password(&hasher, &data, "hunter2"));
    }

    #[test]
    fn test_hash_failure_falls_back_to_plaintext() {
        let mut data = BasicAuthData {
            password: "hunter2".to_string(),
            hash_type: HashType::Argon2,
        };

        hash_basic_auth_password(&FailingHasher, &mut data);

        assert_eq!(data.hash_type, HashType::Plaintext);
        assert_eq!(data.password, "hunter2");
        assert!(verify_basic_auth_password(&Argon2Hasher::new(), &data, "hunter2"));
    }
}
