use crate::error::{AuthError, Result};
use crate::platform::Platform;
use crate::session::{state_key, verifier_key, SessionStore};
use constant_time_eq::constant_time_eq;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// What the token exchange needs once a callback has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationGrant {
    pub platform: Platform,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

/// Validates the redirect back from a platform against the pending attempt.
#[derive(Clone)]
pub struct CallbackHandler {
    store: Arc<dyn SessionStore>,
}

impl CallbackHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Complete a flow whose state was generated and stored by the builder.
    ///
    /// The stored state is consumed on every attempt, matching or not. On success
    /// the PKCE verifier (if any) is removed from the session and returned; on any
    /// failure after the state was consumed, or a provider denial, it is discarded.
    pub fn complete(&self, platform: Platform, callback_url: &str) -> Result<AuthorizationGrant> {
        let params = self.parse_or_discard(platform, callback_url)?;
        let returned = params.get("state").ok_or(AuthError::MissingParameter("state"))?;

        let stored = self.store.take(&state_key(platform))?;
        let checked = match stored {
            None => {
                warn!(platform = platform.as_str(), "callback without a pending authorization");
                Err(AuthError::MissingState(platform))
            }
            Some(expected) if !constant_time_eq(expected.as_bytes(), returned.as_bytes()) => {
                warn!(platform = platform.as_str(), "callback state mismatch");
                Err(AuthError::StateMismatch(platform))
            }
            Some(_) => Ok(()),
        };
        let outcome = checked.and_then(|_| self.finish(platform, params));
        self.discard_verifier_on_error(platform, outcome)
    }

    /// Complete a flow whose state the caller manages itself.
    pub fn complete_with_state(&self, platform: Platform, callback_url: &str, expected_state: &str) -> Result<AuthorizationGrant> {
        let params = self.parse_or_discard(platform, callback_url)?;
        let returned = params.get("state").ok_or(AuthError::MissingParameter("state"))?;
        let outcome = if constant_time_eq(expected_state.as_bytes(), returned.as_bytes()) {
            self.finish(platform, params)
        } else {
            warn!(platform = platform.as_str(), "callback state mismatch");
            Err(AuthError::StateMismatch(platform))
        };
        self.discard_verifier_on_error(platform, outcome)
    }

    /// Forget any pending attempt for `platform`.
    pub fn abandon(&self, platform: Platform) -> Result<()> {
        self.store.delete(&state_key(platform))?;
        self.store.delete(&verifier_key(platform))?;
        info!(platform = platform.as_str(), "abandoned pending authorization");
        Ok(())
    }

    /// A provider denial ends the attempt: both pending entries are dropped.
    fn parse_or_discard(&self, platform: Platform, callback_url: &str) -> Result<HashMap<String, String>> {
        match parse_callback(callback_url) {
            Err(denied @ AuthError::ProviderDenied { .. }) => {
                self.store.delete(&state_key(platform))?;
                self.store.delete(&verifier_key(platform))?;
                warn!(platform = platform.as_str(), "authorization denied by provider");
                Err(denied)
            }
            other => other,
        }
    }

    fn discard_verifier_on_error(&self, platform: Platform, outcome: Result<AuthorizationGrant>) -> Result<AuthorizationGrant> {
        if outcome.is_err() {
            self.store.delete(&verifier_key(platform))?;
        }
        outcome
    }

    fn finish(&self, platform: Platform, mut params: HashMap<String, String>) -> Result<AuthorizationGrant> {
        let code = params.remove("code").filter(|c| !c.is_empty()).ok_or(AuthError::MissingParameter("code"))?;
        let code_verifier = if platform.requires_pkce() {
            Some(
                self.store
                    .take(&verifier_key(platform))?
                    .ok_or(AuthError::MissingState(platform))?,
            )
        } else {
            None
        };
        info!(platform = platform.as_str(), "authorization callback validated");
        Ok(AuthorizationGrant {
            platform,
            code,
            code_verifier,
        })
    }
}

/// Query parameters of a redirect URL. A provider error wins over everything else.
fn parse_callback(callback_url: &str) -> Result<HashMap<String, String>> {
    let url = Url::parse(callback_url.trim()).map_err(|e| AuthError::InvalidCallback(e.to_string()))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if let Some(error) = params.get("error") {
        return Err(AuthError::ProviderDenied {
            error: error.clone(),
            description: params.get("error_description").cloned(),
        });
    }
    Ok(params)
}
