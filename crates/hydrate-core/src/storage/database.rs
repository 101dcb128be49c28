//! SQLite-backed key-value storage.
//!
//! A single `kv` table holds every persisted value (goal, records, settings,
//! quick-add options, the notification outbox).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::KeyValueStore;
use crate::error::PortError;

/// SQLite database exposing the persistence port.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        // Other hydrate processes may hold the write lock briefly.
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PortError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()
        .map_err(|e| PortError::ReadFailed {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PortError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map(|_| ())
        .map_err(|e| PortError::WriteFailed {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    async fn remove(&self, key: &str) -> Result<(), PortError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map(|_| ())
            .map_err(|e| PortError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    /// Runs inside `BEGIN IMMEDIATE`, so another process writing the same
    /// database waits until this transaction commits or rolls back.
    async fn update(
        &self,
        key: &str,
        apply: &mut (dyn FnMut(Option<String>) -> Result<Option<String>, PortError> + Send),
    ) -> Result<(), PortError> {
        let write_failed = |e: rusqlite::Error| PortError::WriteFailed {
            key: key.to_string(),
            message: e.to_string(),
        };

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(write_failed)?;
        let current = tx
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|e| PortError::ReadFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let written = match apply(current)? {
            Some(value) => tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            ),
            None => tx.execute("DELETE FROM kv WHERE key = ?1", params![key]),
        };
        written.map_err(write_failed)?;

        tx.commit().map_err(write_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kv_store() {
        let db = SqliteStore::open_memory().unwrap();
        assert!(db.get("test").await.unwrap().is_none());
        db.set("test", "hello").await.unwrap();
        assert_eq!(db.get("test").await.unwrap().unwrap(), "hello");
        db.set("test", "again").await.unwrap();
        assert_eq!(db.get("test").await.unwrap().unwrap(), "again");
        db.remove("test").await.unwrap();
        assert!(db.get("test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hydrate.db");

        {
            let db = SqliteStore::open(&path).unwrap();
            db.set("daily_goal", "2500").await.unwrap();
        }

        let db = SqliteStore::open(&path).unwrap();
        assert_eq!(db.get("daily_goal").await.unwrap().as_deref(), Some("2500"));
    }

    #[tokio::test]
    async fn update_rolls_back_when_apply_fails() {
        let db = SqliteStore::open_memory().unwrap();
        db.set("pending_reminders", "[1]").await.unwrap();

        let err = db
            .update("pending_reminders", &mut |_| {
                Err(PortError::Corrupt {
                    key: "pending_reminders".into(),
                    message: "bad".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Corrupt { .. }));
        assert_eq!(db.get("pending_reminders").await.unwrap().as_deref(), Some("[1]"));

        db.update("pending_reminders", &mut |current| {
            Ok(current.map(|v| v.replace(']', ",2]")))
        })
        .await
        .unwrap();
        assert_eq!(db.get("pending_reminders").await.unwrap().as_deref(), Some("[1,2]"));

        db.update("pending_reminders", &mut |_| Ok(None)).await.unwrap();
        assert!(db.get("pending_reminders").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updates_from_two_connections_do_not_lose_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hydrate.db");
        let a = std::sync::Arc::new(SqliteStore::open(&path).unwrap());
        let b = std::sync::Arc::new(SqliteStore::open(&path).unwrap());

        let bump = |store: std::sync::Arc<SqliteStore>| {
            std::thread::spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                for _ in 0..50 {
                    rt.block_on(store.update("counter", &mut |current| {
                        let n: u32 = current.map_or(0, |v| v.parse().unwrap_or(0));
                        Ok(Some((n + 1).to_string()))
                    }))
                    .unwrap();
                }
            })
        };
        let (ta, tb) = (bump(a.clone()), bump(b));
        ta.join().unwrap();
        tb.join().unwrap();

        assert_eq!(a.get("counter").await.unwrap().as_deref(), Some("100"));
    }
}
