use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Error, Result};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: String,
    /// Unix seconds after which the entry is stale.
    pub expires_at: u64,
}

/// Key/value storage behind the response cache. Expiry is applied by the
/// provided `get`/`set` so every backend shares the same TTL semantics.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>>;
    fn store(&self, key: &str, entry: CacheEntry) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Returns the cached body if still fresh at `now`; stale entries are evicted.
    fn get(&self, key: &str, now: u64) -> Result<Option<String>> {
        match self.load(key)? {
            Some(entry) if now <= entry.expires_at => Ok(Some(entry.body)),
            Some(_) => {
                self.remove(key)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, body: &str, ttl: Duration, now: u64) -> Result<()> {
        self.store(
            key,
            CacheEntry {
                body: body.to_string(),
                expires_at: now.saturating_add(ttl.as_secs()),
            },
        )
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        let guard = self.entries.lock().map_err(|_| poisoned())?;
        Ok(guard.get(key).cloned())
    }

    fn store(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut guard = self.entries.lock().map_err(|_| poisoned())?;
        guard.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.lock().map_err(|_| poisoned())?;
        guard.remove(key);
        Ok(())
    }
}

pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Drops every entry stale at `now`; returns how many were removed.
    pub fn purge_expired(&self, now: u64) -> Result<usize> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at < ?1",
            params![now as i64],
        )?;
        Ok(removed)
    }
}

impl CacheStore for SqliteCache {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let entry = conn
            .query_row(
                "SELECT body, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    let expires_at: i64 = row.get(1)?;
                    Ok(CacheEntry {
                        body: row.get(0)?,
                        expires_at: expires_at.max(0) as u64,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn store(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        conn.execute(
            r#"
            INSERT INTO cache_entries (key, body, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                expires_at = excluded.expires_at
            "#,
            params![key, entry.body, entry.expires_at.min(i64::MAX as u64) as i64],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn poisoned() -> Error {
    Error::Storage("cache lock poisoned".to_string())
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
