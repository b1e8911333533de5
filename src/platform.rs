use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Social networks an account can be connected to.
/// Endpoints and scopes are fixed per platform and not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Linkedin,
    Facebook,
    Instagram,
    Reddit,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Facebook,
        Platform::Instagram,
        Platform::Reddit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Reddit => "reddit",
        }
    }

    /// Authorization endpoint the user's browser is sent to.
    pub fn authorization_endpoint(&self) -> &'static str {
        match self {
            Platform::Twitter => "https://twitter.com/i/oauth2/authorize",
            Platform::Linkedin => "https://www.linkedin.com/oauth/v2/authorization",
            Platform::Facebook => "https://www.facebook.com/v18.0/dialog/oauth",
            Platform::Instagram => "https://api.instagram.com/oauth/authorize",
            Platform::Reddit => "https://www.reddit.com/api/v1/authorize",
        }
    }

    /// Space separated scope string requested from the platform.
    pub fn scope(&self) -> &'static str {
        match self {
            Platform::Twitter => "tweet.read tweet.write users.read offline.access",
            Platform::Linkedin => "openid profile email w_member_social",
            Platform::Facebook => "pages_manage_posts pages_read_engagement pages_show_list",
            Platform::Instagram => "user_profile user_media",
            Platform::Reddit => "identity submit",
        }
    }

    pub fn requires_pkce(&self) -> bool {
        matches!(self, Platform::Twitter)
    }

    /// Non-standard query parameters a platform expects on the authorization request.
    /// Reddit only issues a refresh token when asked for a permanent grant.
    pub fn extra_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Platform::Reddit => &[("duration", "permanent")],
            _ => &[],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AuthError::UnsupportedPlatform(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_identifiers() {
        for p in Platform::ALL {
            assert_eq!(p.as_str().parse::<Platform>().unwrap(), p);
        }
    }

    #[test]
    fn identifiers_are_matched_exactly() {
        for raw in ["TWITTER", "Reddit", " reddit ", "linkedin\n", ""] {
            let err = raw.parse::<Platform>().unwrap_err();
            assert_eq!(err, AuthError::UnsupportedPlatform(raw.to_string()));
        }
    }

    #[test]
    fn unknown_identifier_is_named_in_error() {
        let err = "tiktok".parse::<Platform>().unwrap_err();
        assert_eq!(err, AuthError::UnsupportedPlatform("tiktok".into()));
    }

    #[test]
    fn only_twitter_uses_pkce() {
        let pkce: Vec<_> = Platform::ALL.into_iter().filter(|p| p.requires_pkce()).collect();
        assert_eq!(pkce, vec![Platform::Twitter]);
    }

    #[test]
    fn endpoints_are_absolute_https() {
        for p in Platform::ALL {
            let u = url::Url::parse(p.authorization_endpoint()).unwrap();
            assert_eq!(u.scheme(), "https");
            assert!(u.query().is_none());
        }
    }
}
