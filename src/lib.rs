//! Core library for social-auth-connect
pub mod config;
pub mod db;
pub mod error;
pub mod oauth;
pub mod platform;
pub mod session;

pub use error::AuthError;
pub use platform::Platform;
