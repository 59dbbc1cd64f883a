//! Certificate existence checks for certificate-bound keys

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;

/// Raw certificates live under this prefix in the backing store
pub const CERTIFICATE_PREFIX: &str = "cert-raw-";

/// Certificates known to the gateway
///
/// Certificate material itself is managed elsewhere; keys only need to know
/// whether the certificate they are bound to is registered.
#[async_trait]
pub trait CertificateStore: Send + Sync + Debug {
    async fn exists(&self, certificate_id: &str) -> Result<bool, DomainError>;
}

#[derive(Debug, Clone)]
pub struct KvCertificateStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvCertificateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, certificate_id: &str, pem: &str) -> Result<(), DomainError> {
        self.store
            .set(&format!("{}{}", CERTIFICATE_PREFIX, certificate_id), pem, None)
            .await
    }
}

#[async_trait]
impl CertificateStore for KvCertificateStore {
    async fn exists(&self, certificate_id: &str) -> Result<bool, DomainError> {
        self.store
            .exists(&format!("{}{}", CERTIFICATE_PREFIX, certificate_id))
            .await
    }
}
