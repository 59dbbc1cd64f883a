//! Session storage, key identity, quotas and the key lifecycle

mod certificates;
mod generator;
mod identity;
mod lifecycle;
mod org;
mod password;
mod quota;
mod store;

pub use certificates::{CertificateStore, KvCertificateStore, CERTIFICATE_PREFIX};
pub use generator::{KeyGenerator, RandomKeyGenerator};
pub use identity::{
    token_hash_function, token_org, token_org_prefix, HashAlgorithm, HashStrategy, KeyIdentity,
};
pub use lifecycle::{KeyLifecycle, KeyLifecycleSettings, ALL_APIS};
pub use org::OrgSessionService;
pub use password::{
    hash_basic_auth_password, verify_basic_auth_password, Argon2Hasher, PasswordHasher,
};
pub use quota::QuotaLedger;
pub use store::{
    SessionStore, ORG_SESSION_PREFIX, QUOTA_KEY_PREFIX, RATE_LIMIT_KEY_PREFIX, SESSION_PREFIX,
};

#[cfg(test)]
pub use generator::SequentialKeyGenerator;
