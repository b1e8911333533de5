pub mod authorize;
pub mod callback;
pub mod connect;
pub mod mock;
pub mod pkce;

use crate::error::{AuthError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub use authorize::{AuthorizationRequestBuilder, OAuthConfig};
pub use callback::{AuthorizationGrant, CallbackHandler};

/// Cryptographic primitives the flow depends on.
/// Injected so tests can substitute fixed output.
pub trait CryptoProvider: Send + Sync {
    /// `len` bytes from a cryptographically secure source.
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>>;

    fn sha256(&self, data: &[u8]) -> Result<[u8; 32]>;
}

/// Operating system randomness and `sha2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCrypto;

impl CryptoProvider for SystemCrypto {
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| AuthError::CryptoUnavailable(format!("secure random source: {}", e)))?;
        Ok(buf)
    }

    fn sha256(&self, data: &[u8]) -> Result<[u8; 32]> {
        Ok(Sha256::digest(data).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_crypto_returns_requested_length() {
        let bytes = SystemCrypto.random_bytes(32).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_ne!(bytes, SystemCrypto.random_bytes(32).unwrap());
    }

    #[test]
    fn system_crypto_sha256_known_value() {
        let digest = SystemCrypto.sha256(b"abc").unwrap();
        assert_eq!(digest[..4], [0xba, 0x78, 0x16, 0xbf]);
    }
}
