use super::CryptoProvider;
use crate::error::{AuthError, Result};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU8, Ordering};

/// Deterministic crypto for tests. Each `random_bytes` call fills the buffer
/// with the next value of a counter, so consecutive calls differ.
#[derive(Debug, Default)]
pub struct SequenceCrypto {
    next: AtomicU8,
}

impl SequenceCrypto {
    pub fn new(start: u8) -> Self {
        Self { next: AtomicU8::new(start) }
    }
}

impl CryptoProvider for SequenceCrypto {
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let b = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(vec![b; len])
    }

    fn sha256(&self, data: &[u8]) -> Result<[u8; 32]> {
        Ok(Sha256::digest(data).into())
    }
}

/// A host without usable cryptography.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCrypto;

impl CryptoProvider for UnavailableCrypto {
    fn random_bytes(&self, _len: usize) -> Result<Vec<u8>> {
        Err(AuthError::CryptoUnavailable("no secure random source".into()))
    }

    fn sha256(&self, _data: &[u8]) -> Result<[u8; 32]> {
        Err(AuthError::CryptoUnavailable("no sha-256 digest".into()))
    }
}
