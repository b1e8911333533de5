use social_auth_connect as lib;
use lib::oauth::connect::run_connect;
use lib::oauth::{AuthorizationRequestBuilder, CallbackHandler, OAuthConfig, SystemCrypto};
use lib::session::MemorySessionStore;
use lib::Platform;
use std::io::Cursor;
use std::sync::Arc;

const REDIRECT: &str = "https://app.example.com/callback";

#[test]
fn interactive_connect_uses_pasted_redirect() {
    let store = Arc::new(MemorySessionStore::new());
    let builder = AuthorizationRequestBuilder::new(store.clone(), Arc::new(SystemCrypto));
    let handler = CallbackHandler::new(store.clone());
    // caller-managed state lets the test know the value before the prompt
    let cfg = OAuthConfig::new("tw", REDIRECT).with_state("fixed-state");

    let pasted = format!("{}?state=fixed-state&code=pasted-code\n", REDIRECT);
    let mut out = Vec::new();
    let grant = run_connect(&builder, &handler, Platform::Twitter, &cfg, Cursor::new(pasted), &mut out)
        .expect("connect");

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("https://twitter.com/i/oauth2/authorize?"));
    assert_eq!(grant.code, "pasted-code");
    assert!(grant.code_verifier.is_some());
    assert!(store.is_empty().unwrap());
}

#[test]
fn empty_paste_abandons_attempt() {
    let store = Arc::new(MemorySessionStore::new());
    let builder = AuthorizationRequestBuilder::new(store.clone(), Arc::new(SystemCrypto));
    let handler = CallbackHandler::new(store.clone());
    let cfg = OAuthConfig::new("r", REDIRECT);

    let result = run_connect(&builder, &handler, Platform::Reddit, &cfg, Cursor::new("\n"), Vec::new());
    assert!(result.is_err());
    assert!(store.is_empty().unwrap());
}
