use crate::error::{AuthError, Result};
use crate::session::{PendingEntry, SessionStore, DEFAULT_STATE_TTL_SECS};
use chrono::{Duration, TimeZone, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS session_state (
    session_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    PRIMARY KEY (session_id, key)
);
CREATE INDEX IF NOT EXISTS idx_session_state_expires ON session_state (expires_at);
";

pub fn open_or_create(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuthError::Storage(format!("creating {}: {}", parent.display(), e)))?;
        }
    }
    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Upsert a session entry; an existing (session_id, key) row is replaced.
pub fn put_entry(conn: &Connection, session_id: &str, key: &str, value: &str, expires_at: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO session_state (session_id, key, value, created_at, expires_at) VALUES (?1, ?2, ?3, strftime('%s','now'), ?4) ON CONFLICT(session_id, key) DO UPDATE SET value = excluded.value, created_at = excluded.created_at, expires_at = excluded.expires_at",
        params![session_id, key, value, expires_at],
    )?;
    Ok(())
}

/// Load a live entry. Rows past their expiry are ignored.
pub fn get_entry(conn: &Connection, session_id: &str, key: &str, now: i64) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM session_state WHERE session_id = ?1 AND key = ?2 AND expires_at > ?3 LIMIT 1")?;
    let row = stmt.query_row(params![session_id, key, now], |r| r.get::<_, String>(0)).optional()?;
    Ok(row)
}

/// Remove an expired row for `key`, if any. Returns true when one was removed.
pub fn delete_expired_entry(conn: &Connection, session_id: &str, key: &str, now: i64) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM session_state WHERE session_id = ?1 AND key = ?2 AND expires_at <= ?3",
        params![session_id, key, now],
    )?;
    Ok(removed > 0)
}

pub fn delete_entry(conn: &Connection, session_id: &str, key: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM session_state WHERE session_id = ?1 AND key = ?2",
        params![session_id, key],
    )?;
    Ok(())
}

pub fn list_live_entries(conn: &Connection, session_id: &str, now: i64) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare("SELECT key, expires_at FROM session_state WHERE session_id = ?1 AND expires_at > ?2 ORDER BY key ASC")?;
    let rows = stmt.query_map(params![session_id, now], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
    let mut v = Vec::new();
    for r in rows {
        v.push(r?);
    }
    Ok(v)
}

/// Delete expired rows across all sessions. Returns the number of rows removed.
pub fn purge_expired_entries(conn: &mut Connection, now: i64) -> Result<usize> {
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM session_state WHERE expires_at <= ?1", params![now])?;
    tx.commit()?;
    Ok(removed)
}

/// SQLite-backed session store. Rows are scoped by `session_id`, so two
/// sessions sharing one database file never see each other's entries.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
    session_id: String,
    ttl: Duration,
}

impl SqliteSessionStore {
    pub fn open(path: &Path, session_id: &str) -> Result<Self> {
        let mut conn = open_or_create(path)?;
        let removed = purge_expired_entries(&mut conn, Utc::now().timestamp())?;
        if removed > 0 {
            debug!("purged {} expired session entries on open", removed);
        }
        Ok(Self::from_connection(conn, session_id))
    }

    pub fn from_connection(conn: Connection, session_id: &str) -> Self {
        Self {
            conn: Mutex::new(conn),
            session_id: session_id.to_string(),
            ttl: Duration::seconds(DEFAULT_STATE_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AuthError::Storage("session database lock poisoned".into()))
    }
}

impl SessionStore for SqliteSessionStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Storage(format!("session ttl of {}s is out of range", self.ttl.num_seconds())))?
            .timestamp();
        put_entry(&*self.conn()?, &self.session_id, key, value, expires_at)?;
        debug!("session {}: stored {}", self.session_id, key);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let now = Utc::now().timestamp();
        if delete_expired_entry(&conn, &self.session_id, key, now)? {
            debug!("session {}: dropped expired {}", self.session_id, key);
        }
        get_entry(&conn, &self.session_id, key, now)
    }

    fn delete(&self, key: &str) -> Result<()> {
        delete_entry(&*self.conn()?, &self.session_id, key)?;
        debug!("session {}: removed {}", self.session_id, key);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingEntry>> {
        let rows = list_live_entries(&*self.conn()?, &self.session_id, Utc::now().timestamp())?;
        rows.into_iter()
            .map(|(key, ts)| {
                let expires_at = Utc
                    .timestamp_opt(ts, 0)
                    .single()
                    .ok_or_else(|| AuthError::Storage(format!("bad expiry timestamp {} for {}", ts, key)))?;
                Ok(PendingEntry { key, expires_at })
            })
            .collect()
    }

    fn purge_expired(&self) -> Result<usize> {
        let removed = purge_expired_entries(&mut *self.conn()?, Utc::now().timestamp())?;
        if removed > 0 {
            debug!("purged {} expired session entries", removed);
        }
        Ok(removed)
    }
}
