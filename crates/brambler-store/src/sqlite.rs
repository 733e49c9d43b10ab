//! SQLite implementation of the KeyBackend trait.
//!
//! This is the device-local backend: always available, durable across
//! restarts, never synced. It uses rusqlite with bundled SQLite, wrapped in
//! async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use brambler_core::KeySource;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::persistence::now_millis;
use crate::traits::KeyBackend;

/// SQLite-based device-local backend.
///
/// Thread-safe via internal Mutex. All operations run on the blocking pool.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| StoreError::Backend {
                backend: KeySource::Local,
                message: format!("mutex poisoned: {}", e),
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend {
            backend: KeySource::Local,
            message: format!("spawn_blocking failed: {}", e),
        })?
    }
}

#[async_trait]
impl KeyBackend for SqliteBackend {
    fn source(&self) -> KeySource {
        KeySource::Local
    }

    async fn is_supported(&self) -> bool {
        true
    }

    async fn get(&self, item: &str) -> Result<Option<String>> {
        let item = item.to_string();
        self.with_conn(move |conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM key_items WHERE item_key = ?1",
                    params![item],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, item: &str, value: &str) -> Result<()> {
        let item = item.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO key_items (item_key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(item_key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![item, value, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, item: &str) -> Result<bool> {
        let item = item.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM key_items WHERE item_key = ?1", params![item])?;
            Ok(removed > 0)
        })
        .await
    }
}
