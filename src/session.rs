use crate::error::{AuthError, Result};
use crate::platform::Platform;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Default lifetime of a pending authorization entry.
pub const DEFAULT_STATE_TTL_SECS: i64 = 600;

/// Longest lifetime a pending authorization entry may be configured with (one week).
pub const MAX_STATE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Session key holding the anti-forgery state for a platform.
pub fn state_key(platform: Platform) -> String {
    format!("{}_oauth_state", platform.as_str())
}

/// Session key holding the PKCE code verifier for a platform.
pub fn verifier_key(platform: Platform) -> String {
    format!("{}_code_verifier", platform.as_str())
}

/// A live entry, as reported by `SessionStore::pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Session-scoped key/value storage bridging the redirect round trip.
///
/// `put` always overwrites: a second authorization attempt for the same
/// platform replaces the first. Expired entries read as absent.
pub trait SessionStore: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn delete(&self, key: &str) -> Result<()>;

    /// Live entries of this session, sorted by key.
    fn pending(&self) -> Result<Vec<PendingEntry>>;

    /// Drop every expired entry. Returns the number removed.
    fn purge_expired(&self) -> Result<usize>;

    /// Read and delete in one step.
    fn take(&self, key: &str) -> Result<Option<String>> {
        let value = self.get(key)?;
        if value.is_some() {
            self.delete(key)?;
        }
        Ok(value)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process store; one instance stands for one browser session.
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_STATE_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Storage("session store lock poisoned".into()))
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Utc::now().checked_add_signed(self.ttl).ok_or_else(|| {
                AuthError::Storage(format!("session ttl of {}s is out of range", self.ttl.num_seconds()))
            })?,
        };
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(e) if e.expires_at > Utc::now() => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingEntry>> {
        let now = Utc::now();
        let mut out: Vec<PendingEntry> = self
            .lock()?
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(k, e)| PendingEntry {
                key: k.clone(),
                expires_at: e.expires_at,
            })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        Ok(before - entries.len())
    }
}
