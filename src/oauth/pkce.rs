// PKCE (RFC 7636) helpers, S256 only
use super::CryptoProvider;
use crate::error::Result;
use base64::{engine::general_purpose, Engine as _};

/// Bytes of entropy in a code verifier; encodes to 43 characters.
pub const VERIFIER_BYTES: usize = 32;

pub fn generate_code_verifier(crypto: &dyn CryptoProvider) -> Result<String> {
    let bytes = crypto.random_bytes(VERIFIER_BYTES)?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

pub fn code_challenge_s256(crypto: &dyn CryptoProvider, verifier: &str) -> Result<String> {
    let hash = crypto.sha256(verifier.as_bytes())?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(hash))
}

/// True when `challenge` is the S256 transform of `verifier`.
pub fn verify_challenge(crypto: &dyn CryptoProvider, verifier: &str, challenge: &str) -> Result<bool> {
    Ok(code_challenge_s256(crypto, verifier)? == challenge)
}
