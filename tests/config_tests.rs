use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

use social_auth_connect::config::Config;
use social_auth_connect::{AuthError, Platform};

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    (td, cfg_path)
}

#[test]
fn config_from_path_parses_toml() {
    let (_td, path) = write_config(
        r#"
session_db_path = "/tmp/session.db"
log_dir = "/tmp"
redirect_uri = "https://app.example.com/callback"

[platforms.twitter]
client_id = "tw-id"

[platforms.reddit]
client_id = "rd-id"
redirect_uri = "https://app.example.com/reddit"
"#,
    );
    let cfg = Config::from_path(&path).expect("parse config");
    assert_eq!(cfg.session_db_path.to_str().unwrap(), "/tmp/session.db");
    assert_eq!(cfg.state_ttl_secs, 600);

    let tw = cfg.oauth_config(Platform::Twitter, None).unwrap();
    assert_eq!(tw.client_id, "tw-id");
    assert_eq!(tw.redirect_uri, "https://app.example.com/callback");

    let rd = cfg.oauth_config(Platform::Reddit, Some("mine".into())).unwrap();
    assert_eq!(rd.redirect_uri, "https://app.example.com/reddit");
    assert_eq!(rd.state.as_deref(), Some("mine"));
}

#[test]
fn missing_platform_section_is_invalid_configuration() {
    let (_td, path) = write_config("redirect_uri = \"https://app.example.com/cb\"\n");
    let cfg = Config::from_path(&path).unwrap();
    let err = cfg.oauth_config(Platform::Linkedin, None).unwrap_err();
    assert!(matches!(err, AuthError::InvalidConfiguration(_)));
}

#[test]
fn unknown_platform_section_fails_validation() {
    let (_td, path) = write_config(
        r#"
redirect_uri = "https://app.example.com/cb"
[platforms.tiktok]
client_id = "x"
"#,
    );
    let err = Config::from_path(&path).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AuthError>(),
        Some(&AuthError::UnsupportedPlatform("tiktok".into()))
    );
}

#[test]
fn empty_client_id_fails_validation() {
    let (_td, path) = write_config(
        r#"
redirect_uri = "https://app.example.com/cb"
[platforms.facebook]
client_id = ""
"#,
    );
    assert!(Config::from_path(&path).is_err());
}

#[test]
fn non_positive_ttl_fails_validation() {
    let (_td, path) = write_config("state_ttl_secs = 0\n");
    assert!(Config::from_path(&path).is_err());
}

#[test]
fn example_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/example-config.toml");
    let cfg = Config::from_path(&path).expect("example config parses");
    for platform in Platform::ALL {
        assert!(cfg.oauth_config(platform, None).is_ok(), "{}", platform);
    }
}

#[test]
fn oversized_ttl_is_invalid_configuration() {
    let (_td, path) = write_config("state_ttl_secs = 1000000000000000\n");
    let err = Config::from_path(&path).unwrap_err();
    assert!(matches!(err.downcast_ref::<AuthError>(), Some(AuthError::InvalidConfiguration(_))));
}

#[test]
fn ttl_upper_bound_is_one_week() {
    let (_td, path) = write_config("state_ttl_secs = 604800\n");
    let cfg = Config::from_path(&path).expect("one week is accepted");
    assert_eq!(cfg.state_ttl(), chrono::Duration::weeks(1));

    let (_td, path) = write_config("state_ttl_secs = 604801\n");
    assert!(Config::from_path(&path).is_err());
}

#[test]
fn platform_sections_are_case_sensitive() {
    let (_td, path) = write_config(
        r#"
redirect_uri = "https://app.example.com/cb"
[platforms.Twitter]
client_id = "x"
"#,
    );
    let err = Config::from_path(&path).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AuthError>(),
        Some(&AuthError::UnsupportedPlatform("Twitter".into()))
    );
}
