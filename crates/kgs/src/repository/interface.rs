use crate::{Key, Result};

/// Storage contract for a key pool.
///
/// A pool is partitioned into an *available* set (committed, not yet handed
/// out) and a *used* set (handed out, permanent). A key lives in exactly one of
/// the two sets and is never written twice over the pool's lifetime.
///
/// Implementations synchronize every mutation internally so that these
/// invariants hold under arbitrary interleavings of concurrent callers. Each
/// method is a suspension point: backends may block on I/O, and callers bound
/// how many calls are in flight at once.
///
/// # Errors
///
/// [`Error::StoreUnavailable`] signals backend malfunction on every method and
/// is never used for ordinary negative results.
///
/// [`Error::StoreUnavailable`]: crate::Error::StoreUnavailable
pub trait Repository: Send + Sync {
    /// Returns `true` if `key` is in the pool, available or used.
    ///
    /// An absent key is `Ok(false)`, not an error.
    fn key_exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Adds `key` to the available set.
    ///
    /// Atomic with respect to concurrent `write_key` and `key_exists` calls on
    /// the same key: of two concurrent writers, at most one succeeds and the
    /// other receives [`Error::DuplicateKey`]. Writing a key that was already
    /// handed out is also a [`Error::DuplicateKey`].
    ///
    /// [`Error::DuplicateKey`]: crate::Error::DuplicateKey
    fn write_key(&self, key: Key) -> impl Future<Output = Result<()>> + Send;

    /// Atomically moves exactly `count` keys from the available set to the
    /// used set and returns them.
    ///
    /// Concurrent calls never receive the same key.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCount`] if `count <= 0`.
    /// - [`Error::InsufficientSupply`] if fewer than `count` keys are
    ///   available. Nothing is removed.
    ///
    /// [`Error::InvalidCount`]: crate::Error::InvalidCount
    /// [`Error::InsufficientSupply`]: crate::Error::InsufficientSupply
    fn get_keys(&self, count: i64) -> impl Future<Output = Result<Vec<Key>>> + Send;
}

/// Validates an allocation count, returning it as a `usize`.
pub(crate) fn checked_count(count: i64) -> Result<usize> {
    if count <= 0 {
        return Err(crate::Error::InvalidCount { count });
    }
    // A count beyond the address space can never be satisfied.
    usize::try_from(count).map_err(|_| crate::Error::InsufficientSupply {
        requested: count as u64,
        available: 0,
    })
}
