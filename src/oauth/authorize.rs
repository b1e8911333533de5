use super::{pkce, CryptoProvider};
use crate::error::{AuthError, Result};
use crate::platform::Platform;
use crate::session::{state_key, verifier_key, SessionStore};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const STATE_PREFIX: &str = "state";
const STATE_RANDOM_BYTES: usize = 16;

/// Client settings for one platform, supplied by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    /// Caller-managed anti-forgery state. When set it is used verbatim and
    /// never written to the session store.
    #[serde(default)]
    pub state: Option<String>,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            state: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Reject configurations that would produce a broken URL.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration("client_id is empty".into()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration("redirect_uri is empty".into()));
        }
        Url::parse(&self.redirect_uri).map_err(|e| {
            AuthError::InvalidConfiguration(format!(
                "redirect_uri {:?} is not an absolute url: {}",
                self.redirect_uri, e
            ))
        })?;
        Ok(())
    }
}

/// Builds platform authorization URLs and records what the callback will need.
#[derive(Clone)]
pub struct AuthorizationRequestBuilder {
    store: Arc<dyn SessionStore>,
    crypto: Arc<dyn CryptoProvider>,
}

impl AuthorizationRequestBuilder {
    pub fn new(store: Arc<dyn SessionStore>, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self { store, crypto }
    }

    /// Build the authorization URL for a platform given by identifier.
    pub fn build_authorization_url(&self, platform: &str, config: &OAuthConfig) -> Result<Url> {
        let platform: Platform = platform.parse()?;
        self.build_for(platform, config)
    }

    /// Build the authorization URL for `platform`.
    ///
    /// Nothing is written to the session store unless the whole URL could be
    /// produced. A generated state is stored under `{platform}_oauth_state`; for
    /// PKCE platforms the verifier goes under `{platform}_code_verifier`. Both
    /// overwrite whatever an earlier attempt for the same platform left behind.
    pub fn build_for(&self, platform: Platform, config: &OAuthConfig) -> Result<Url> {
        config.validate()?;

        let mut url = Url::parse(platform.authorization_endpoint()).map_err(|e| {
            AuthError::InvalidConfiguration(format!("{} endpoint: {}", platform, e))
        })?;

        let (state, generated) = match &config.state {
            Some(s) => (s.clone(), false),
            None => (self.generate_state(platform)?, true),
        };

        let pkce = if platform.requires_pkce() {
            let verifier = pkce::generate_code_verifier(self.crypto.as_ref())?;
            let challenge = pkce::code_challenge_s256(self.crypto.as_ref(), &verifier)?;
            Some((verifier, challenge))
        } else {
            None
        };

        {
            let mut q = url.query_pairs_mut();
            q.append_pair("response_type", "code")
                .append_pair("client_id", &config.client_id)
                .append_pair("redirect_uri", &config.redirect_uri)
                .append_pair("scope", platform.scope())
                .append_pair("state", &state);
            if let Some((_, challenge)) = &pkce {
                q.append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", "S256");
            }
            for (k, v) in platform.extra_params() {
                q.append_pair(k, v);
            }
        }

        self.persist(platform, generated.then_some(state.as_str()), pkce.as_ref().map(|(v, _)| v.as_str()))?;

        info!(
            platform = platform.as_str(),
            pkce = pkce.is_some(),
            caller_state = !generated,
            "built authorization url"
        );
        Ok(url)
    }

    /// `state_<random>_<platform>`, random part drawn from the injected crypto.
    fn generate_state(&self, platform: Platform) -> Result<String> {
        let random = self.crypto.random_bytes(STATE_RANDOM_BYTES)?;
        Ok(format!(
            "{}_{}_{}",
            STATE_PREFIX,
            general_purpose::URL_SAFE_NO_PAD.encode(random),
            platform.as_str()
        ))
    }

    fn persist(&self, platform: Platform, state: Option<&str>, verifier: Option<&str>) -> Result<()> {
        let skey = state_key(platform);
        if let Some(state) = state {
            self.store.put(&skey, state)?;
            debug!(key = %skey, "stored authorization state");
        }
        if let Some(verifier) = verifier {
            let vkey = verifier_key(platform);
            if let Err(e) = self.store.put(&vkey, verifier) {
                if state.is_some() {
                    if let Err(rollback) = self.store.delete(&skey) {
                        warn!(key = %skey, error = %rollback, "failed to roll back authorization state");
                    }
                }
                return Err(e);
            }
            debug!(key = %vkey, "stored pkce verifier");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::mock::SequenceCrypto;
    use crate::session::MemorySessionStore;

    #[test]
    fn generated_state_has_prefix_and_platform_suffix() {
        let builder = AuthorizationRequestBuilder::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(SequenceCrypto::new(7)),
        );
        let state = builder.generate_state(Platform::Linkedin).unwrap();
        assert!(state.starts_with("state_"));
        assert!(state.ends_with("_linkedin"));
        assert_eq!(state, format!("state_{}_linkedin", general_purpose::URL_SAFE_NO_PAD.encode([7u8; 16])));
    }

    #[test]
    fn relative_redirect_uri_is_rejected() {
        let err = OAuthConfig::new("id", "/callback").validate().unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfiguration(_)));
    }

    #[test]
    fn whitespace_client_id_is_rejected() {
        let err = OAuthConfig::new("   ", "https://app.example.com/cb").validate().unwrap_err();
        assert_eq!(err, AuthError::InvalidConfiguration("client_id is empty".into()));
    }
}
