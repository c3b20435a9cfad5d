//! Storage backend selected at startup.

use kgs::{Key, MemoryRepository, Repository, Result, SqliteRepository};
use std::path::Path;

/// The repository a server instance allocates from.
///
/// The pool is generic over its repository; the server picks one at runtime
/// from its configuration, so the choice is wrapped in an enum that forwards
/// every call.
#[derive(Debug)]
pub enum Backend {
    /// Volatile pool, lost on exit.
    Memory(MemoryRepository),
    /// Pool persisted in a SQLite database file.
    Sqlite(SqliteRepository),
}

impl Backend {
    /// Opens the SQLite database at `path`, or an in-memory pool when no path
    /// is given.
    ///
    /// # Errors
    ///
    /// Returns [`kgs::Error::StoreUnavailable`] if the database cannot be
    /// opened.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => SqliteRepository::open(path).map(Self::Sqlite),
            None => Ok(Self::Memory(MemoryRepository::new())),
        }
    }

    /// Short label for log output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    /// Number of keys waiting to be handed out.
    ///
    /// # Errors
    ///
    /// Returns [`kgs::Error::StoreUnavailable`] if the store cannot be read.
    pub async fn available_len(&self) -> Result<u64> {
        match self {
            Self::Memory(repo) => Ok(repo.available_len() as u64),
            Self::Sqlite(repo) => repo.available_len().await,
        }
    }
}

impl Repository for Backend {
    async fn key_exists(&self, key: &str) -> Result<bool> {
        match self {
            Self::Memory(repo) => repo.key_exists(key).await,
            Self::Sqlite(repo) => repo.key_exists(key).await,
        }
    }

    async fn write_key(&self, key: Key) -> Result<()> {
        match self {
            Self::Memory(repo) => repo.write_key(key).await,
            Self::Sqlite(repo) => repo.write_key(key).await,
        }
    }

    async fn get_keys(&self, count: i64) -> Result<Vec<Key>> {
        match self {
            Self::Memory(repo) => repo.get_keys(count).await,
            Self::Sqlite(repo) => repo.get_keys(count).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_memory_without_a_path() {
        let backend = Backend::open(None).unwrap();
        assert_eq!(backend.kind(), "memory");
    }

    #[tokio::test]
    async fn forwards_to_the_selected_store() {
        let dir = std::env::temp_dir().join(format!("kgs-backend-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&dir);

        let backend = Backend::open(Some(&dir)).unwrap();
        assert_eq!(backend.kind(), "sqlite");

        backend.write_key("abcd".to_string()).await.unwrap();
        assert_eq!(backend.key_exists("abcd").await, Ok(true));
        assert_eq!(backend.available_len().await, Ok(1));
        assert_eq!(backend.get_keys(1).await, Ok(vec!["abcd".to_string()]));
        assert_eq!(backend.available_len().await, Ok(0));

        drop(backend);
        let _ = std::fs::remove_file(&dir);
    }
}
