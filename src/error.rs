use crate::platform::Platform;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures surfaced by the authorization flow.
///
/// Configuration errors are caller-correctable; environment errors mean the host
/// cannot run the flow at all. Nothing here is retried internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cryptography unavailable: {0}")]
    CryptoUnavailable(String),

    #[error("session storage failed: {0}")]
    Storage(String),

    /// The platform redirected back with `error=...` instead of a code.
    #[error("authorization denied by provider: {error}{}", detail(.description))]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    #[error("callback is missing the `{0}` parameter")]
    MissingParameter(&'static str),

    #[error("no pending authorization for {0}")]
    MissingState(Platform),

    #[error("state parameter does not match the pending authorization for {0}")]
    StateMismatch(Platform),

    #[error("invalid callback url: {0}")]
    InvalidCallback(String),
}

fn detail(description: &Option<String>) -> String {
    match description {
        Some(d) => format!(" ({})", d),
        None => String::new(),
    }
}

impl AuthError {
    /// Input problems the caller can fix before trying again.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            AuthError::UnsupportedPlatform(_) | AuthError::InvalidConfiguration(_)
        )
    }

    /// The hosting environment cannot start a sign-in at all.
    pub fn is_environment_error(&self) -> bool {
        matches!(self, AuthError::CryptoUnavailable(_) | AuthError::Storage(_))
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}
