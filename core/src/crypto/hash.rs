use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("hash primitive unavailable: {0}")]
    Unavailable(String),
}

/// SHA-256 provider used by reward attribution.
///
/// Async so that an implementation may hand the work to another task or an
/// external crypto service. Must be deterministic.
#[async_trait]
pub trait HashPrimitive: Send + Sync {
    async fn sha256(&self, data: &[u8]) -> Result<[u8; 32], HashError>;
}

/// In-process SHA-256 backed by `sha2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

#[async_trait]
impl HashPrimitive for Sha256Hasher {
    async fn sha256(&self, data: &[u8]) -> Result<[u8; 32], HashError> {
        Ok(Sha256::digest(data).into())
    }
}

#[async_trait]
impl<T: HashPrimitive + ?Sized> HashPrimitive for Arc<T> {
    async fn sha256(&self, data: &[u8]) -> Result<[u8; 32], HashError> {
        (**self).sha256(data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::to_hex;

    #[tokio::test]
    async fn test_sha256_known_vector() {
        let digest = Sha256Hasher.sha256(b"abc").await.unwrap();
        assert_eq!(
            to_hex(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_arc_hasher_delegates() {
        let hasher: Arc<dyn HashPrimitive> = Arc::new(Sha256Hasher);
        let a = hasher.sha256(b"x").await.unwrap();
        let b = Sha256Hasher.sha256(b"x").await.unwrap();
        assert_eq!(a, b);
    }
}
