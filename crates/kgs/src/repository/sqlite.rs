//! SQLite-backed key store.
//!
//! The pool lives in two tables, `keys` (available) and `used_keys` (handed
//! out), each keyed by the key value. Compound operations run inside an
//! `IMMEDIATE` transaction, which takes the database write lock up front so
//! that check-then-insert and count-select-move cannot interleave with another
//! writer, including writers in other processes sharing the database file.
//!
//! `rusqlite` is blocking, so every call is shipped to Tokio's blocking pool.

use crate::{Error, Key, Repository, Result, repository::checked_count};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use std::{path::Path, sync::Arc};

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS keys (
        value TEXT PRIMARY KEY NOT NULL
    );

    CREATE TABLE IF NOT EXISTS used_keys (
        value TEXT PRIMARY KEY NOT NULL
    );
";

const KEY_PRESENT_SQL: &str = "
    SELECT 1 FROM keys WHERE value = ?1
    UNION ALL
    SELECT 1 FROM used_keys WHERE value = ?1
    LIMIT 1
";

/// A [`Repository`] persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the database cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::store(format!("open failed: {e}")))?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::store(format!("open failed: {e}")))?;
        Self::from_connection(conn)
    }

    /// Wraps an existing connection, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if schema initialization fails.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::store(format!("schema init failed: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of keys waiting to be handed out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the query fails.
    pub async fn available_len(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM keys").await
    }

    /// Number of keys already handed out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the query fails.
    pub async fn used_len(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM used_keys").await
    }

    async fn count(&self, sql: &'static str) -> Result<u64> {
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(sql, [], |row| row.get(0))
                .map_err(|e| Error::store(format!("count failed: {e}")))?;
            Ok(count.unsigned_abs())
        })
        .await
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::store(format!("sqlite task failed: {e}")))?
    }
}

fn key_present(conn: &Connection, key: &str) -> Result<bool> {
    conn.query_row(KEY_PRESENT_SQL, params![key], |_| Ok(()))
        .optional()
        .map(|row| row.is_some())
        .map_err(|e| Error::store(format!("existence check failed: {e}")))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    )
}

impl Repository for SqliteRepository {
    async fn key_exists(&self, key: &str) -> Result<bool> {
        let key = key.to_owned();
        self.with_conn(move |conn| key_present(conn, &key)).await
    }

    async fn write_key(&self, key: Key) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| Error::store(format!("begin failed: {e}")))?;

            if key_present(&tx, &key)? {
                return Err(Error::DuplicateKey { key });
            }

            let inserted = tx.execute("INSERT INTO keys (value) VALUES (?1)", params![key]);
            match inserted {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => return Err(Error::DuplicateKey { key }),
                Err(e) => return Err(Error::store(format!("insert failed: {e}"))),
            }

            tx.commit()
                .map_err(|e| Error::store(format!("commit failed: {e}")))
        })
        .await
    }

    async fn get_keys(&self, count: i64) -> Result<Vec<Key>> {
        let requested = checked_count(count)?;
        self.with_conn(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| Error::store(format!("begin failed: {e}")))?;

            let available: i64 = tx
                .query_row("SELECT COUNT(*) FROM keys", [], |row| row.get(0))
                .map_err(|e| Error::store(format!("count failed: {e}")))?;
            if count > available {
                return Err(Error::InsufficientSupply {
                    requested: requested as u64,
                    available: available.unsigned_abs(),
                });
            }

            let keys = {
                let mut stmt = tx
                    .prepare("SELECT value FROM keys LIMIT ?1")
                    .map_err(|e| Error::store(format!("select failed: {e}")))?;
                stmt.query_map(params![count], |row| row.get::<_, String>(0))
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                    .map_err(|e| Error::store(format!("select failed: {e}")))?
            };

            for key in &keys {
                tx.execute("DELETE FROM keys WHERE value = ?1", params![key])
                    .map_err(|e| Error::store(format!("delete failed: {e}")))?;
                tx.execute("INSERT INTO used_keys (value) VALUES (?1)", params![key])
                    .map_err(|e| Error::store(format!("mark used failed: {e}")))?;
            }

            tx.commit()
                .map_err(|e| Error::store(format!("commit failed: {e}")))?;
            Ok(keys)
        })
        .await
    }
}
