use crate::error::AuthError;
use crate::oauth::OAuthConfig;
use crate::platform::Platform;
use crate::session::{DEFAULT_STATE_TTL_SECS, MAX_STATE_TTL_SECS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // path to the session database
    #[serde(default = "default_session_db_path")]
    pub session_db_path: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Seconds a pending state/verifier stays usable.
    #[serde(default = "default_state_ttl")]
    pub state_ttl_secs: i64,
    /// Redirect URI used by platforms that don't set their own.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformClient>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PlatformClient {
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

fn default_session_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join("social-auth")
        .join("session.db")
}
fn default_log_dir() -> PathBuf { "/var/log/social-auth".into() }
fn default_state_ttl() -> i64 { DEFAULT_STATE_TTL_SECS }

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.state_ttl_secs <= 0 || self.state_ttl_secs > MAX_STATE_TTL_SECS {
            return Err(AuthError::InvalidConfiguration(format!(
                "state_ttl_secs must be between 1 and {}, got {}",
                MAX_STATE_TTL_SECS, self.state_ttl_secs
            )));
        }
        for name in self.platforms.keys() {
            let platform: Platform = name.parse()?;
            self.oauth_config(platform, None)?.validate()?;
        }
        Ok(())
    }

    /// Entry lifetime, clamped to the accepted range for configs built without `validate`.
    pub fn state_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.state_ttl_secs.clamp(1, MAX_STATE_TTL_SECS))
    }

    /// Client configuration for `platform`, with the shared redirect URI filled in.
    pub fn oauth_config(&self, platform: Platform, state: Option<String>) -> Result<OAuthConfig, AuthError> {
        let client = self
            .platforms
            .get(platform.as_str())
            .ok_or_else(|| AuthError::InvalidConfiguration(format!("no [platforms.{}] section", platform)))?;
        let redirect_uri = client
            .redirect_uri
            .clone()
            .or_else(|| self.redirect_uri.clone())
            .ok_or_else(|| AuthError::InvalidConfiguration(format!("no redirect_uri for {}", platform)))?;
        Ok(OAuthConfig {
            client_id: client.client_id.clone(),
            redirect_uri,
            state,
        })
    }
}
