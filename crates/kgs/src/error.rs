use core::time::Duration;

/// A result type carrying the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `kgs` can produce.
///
/// Errors fall into two groups:
///
/// - **Collisions** ([`Error::DuplicateKey`]) are expected while filling a
///   pool and are recovered locally by generating a new candidate. They never
///   surface from a fill.
/// - **Everything else** is surfaced to the caller. [`Error::StoreUnavailable`]
///   in particular is fatal for the operation in flight and is never retried
///   internally.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured key length is zero.
    #[error("invalid key length {length}: must be greater than 0")]
    InvalidLength {
        /// The rejected length.
        length: usize,
    },

    /// The store concurrency ceiling is zero.
    #[error("invalid concurrency ceiling: must be greater than 0")]
    InvalidConcurrency,

    /// The requested pool size exceeds the number of distinct keys of the
    /// configured length, so a fill could never complete.
    #[error("pool size {pool_size} exceeds the key space of {key_space} keys")]
    PoolTooLarge {
        /// The requested pool size.
        pool_size: usize,
        /// Number of distinct keys of the configured length.
        key_space: u64,
    },

    /// An allocation asked for zero or a negative number of keys.
    #[error("invalid key count {count}: must be greater than 0")]
    InvalidCount {
        /// The rejected count.
        count: i64,
    },

    /// An allocation asked for more keys than are currently available.
    ///
    /// Nothing was removed from the pool. The caller may retry once more keys
    /// exist.
    #[error("insufficient supply: requested {requested} keys, {available} available")]
    InsufficientSupply {
        /// Number of keys requested.
        requested: u64,
        /// Number of keys available at the time of the request.
        available: u64,
    },

    /// The backing store malfunctioned.
    #[error("store unavailable: {context}")]
    StoreUnavailable {
        /// Backend-specific description of the failure.
        context: String,
    },

    /// A write lost a race against another writer of the same key, or the key
    /// already exists in the pool.
    #[error("duplicate key {key:?}")]
    DuplicateKey {
        /// The key that was already present.
        key: String,
    },

    /// An allocation did not complete within its time budget.
    #[error("allocation timed out after {after:?}")]
    Timeout {
        /// The budget that was exceeded.
        after: Duration,
    },
}

impl Error {
    /// Builds a [`Error::StoreUnavailable`] from any displayable cause.
    pub fn store(context: impl core::fmt::Display) -> Self {
        Self::StoreUnavailable {
            context: context.to_string(),
        }
    }

    /// Returns `true` for errors that a fill worker recovers from by
    /// generating a fresh candidate.
    pub const fn is_collision(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}
