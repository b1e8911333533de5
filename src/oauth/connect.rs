use super::{AuthorizationGrant, AuthorizationRequestBuilder, CallbackHandler, OAuthConfig};
use crate::platform::Platform;
use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};
use tracing::info;

/// Manual connect helper, no embedded HTTP server:
/// 1. Build the platform authorization URL and print it.
/// 2. The user opens it, approves, and lands on the redirect URI.
/// 3. The user pastes the full redirect URL back.
/// 4. The callback is validated against the pending session entries and the
///    grant (code plus PKCE verifier) is returned for the token exchange.
pub fn run_connect<R: BufRead, W: Write>(
    builder: &AuthorizationRequestBuilder,
    handler: &CallbackHandler,
    platform: Platform,
    config: &OAuthConfig,
    mut input: R,
    mut out: W,
) -> Result<AuthorizationGrant> {
    let url = builder
        .build_for(platform, config)
        .with_context(|| format!("building {} authorization url", platform))?;

    writeln!(
        out,
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        url
    )?;
    writeln!(out, "After authorizing, you'll be redirected to {}. Copy the full redirect URL and paste it here.", config.redirect_uri)?;
    writeln!(out, "Paste redirect URL:")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let pasted = line.trim();
    if pasted.is_empty() {
        handler.abandon(platform)?;
        return Err(anyhow!("no redirect URL provided"));
    }

    let grant = match &config.state {
        Some(expected) => handler.complete_with_state(platform, pasted, expected),
        None => handler.complete(platform, pasted),
    }
    .with_context(|| format!("completing {} authorization", platform))?;

    info!("{} authorization completed", platform);
    Ok(grant)
}
