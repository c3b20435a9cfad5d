//! In-process key store.
//!
//! [`MemoryRepository`] keeps both partitions of the pool behind a single
//! [`parking_lot::Mutex`]. Every operation runs as one critical section, which
//! makes check-then-insert and select-then-move atomic without further
//! coordination. It is the reference implementation of [`Repository`] and the
//! default test double.

use crate::{Error, Key, Repository, Result, repository::checked_count};
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Partitions {
    available: HashSet<Key>,
    used: HashSet<Key>,
}

/// A concurrency-safe, in-memory [`Repository`].
#[derive(Debug, Default)]
pub struct MemoryRepository {
    partitions: Mutex<Partitions>,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys waiting to be handed out.
    pub fn available_len(&self) -> usize {
        self.partitions.lock().available.len()
    }

    /// Number of keys already handed out.
    pub fn used_len(&self) -> usize {
        self.partitions.lock().used.len()
    }

    /// Returns `true` if `key` has been handed out.
    pub fn is_used(&self, key: &str) -> bool {
        self.partitions.lock().used.contains(key)
    }

    /// Returns a copy of the available set.
    pub fn available_keys(&self) -> HashSet<Key> {
        self.partitions.lock().available.clone()
    }

    /// Simulates a backend outage.
    ///
    /// While set, every [`Repository`] call fails with
    /// [`Error::StoreUnavailable`] and leaves the pool untouched.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::store("memory repository marked unavailable"));
        }
        Ok(())
    }
}

impl Repository for MemoryRepository {
    async fn key_exists(&self, key: &str) -> Result<bool> {
        self.ensure_available()?;
        let partitions = self.partitions.lock();
        Ok(partitions.available.contains(key) || partitions.used.contains(key))
    }

    async fn write_key(&self, key: Key) -> Result<()> {
        self.ensure_available()?;
        let mut partitions = self.partitions.lock();
        if partitions.used.contains(&key) || partitions.available.contains(&key) {
            return Err(Error::DuplicateKey { key });
        }
        partitions.available.insert(key);
        Ok(())
    }

    async fn get_keys(&self, count: i64) -> Result<Vec<Key>> {
        let requested = checked_count(count)?;
        self.ensure_available()?;

        let mut partitions = self.partitions.lock();
        let available = partitions.available.len();
        if requested > available {
            return Err(Error::InsufficientSupply {
                requested: requested as u64,
                available: available as u64,
            });
        }

        let keys: Vec<Key> = partitions
            .available
            .iter()
            .take(requested)
            .cloned()
            .collect();
        for key in &keys {
            partitions.available.remove(key);
            partitions.used.insert(key.clone());
        }
        Ok(keys)
    }
}
