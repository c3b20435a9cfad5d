//! Batch allocation of pooled keys.

use crate::{Error, Key, Repository, Result};
use core::time::Duration;
use std::sync::Arc;

/// Hands out keys in batches under a time budget.
///
/// Each call delegates to [`Repository::get_keys`], which moves the keys from
/// the available set to the used set atomically. The budget wraps the call
/// observably: on expiry the caller gets [`Error::Timeout`] and must treat the
/// allocation as not having happened. A backend that cannot cancel in-flight
/// work (such as one running on a blocking thread) may still commit the move
/// after the timeout; those keys are then retired without being returned.
#[derive(Debug)]
pub struct BatchAllocator<R> {
    repo: Arc<R>,
    timeout: Duration,
}

impl<R> Clone for BatchAllocator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            timeout: self.timeout,
        }
    }
}

impl<R: Repository> BatchAllocator<R> {
    /// Default allocation budget.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates an allocator with [`Self::DEFAULT_TIMEOUT`].
    pub const fn new(repo: Arc<R>) -> Self {
        Self::with_timeout(repo, Self::DEFAULT_TIMEOUT)
    }

    /// Creates an allocator with a custom budget.
    pub const fn with_timeout(repo: Arc<R>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    /// The allocation budget.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The repository keys are drawn from.
    pub const fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Removes exactly `count` keys from the pool and returns them.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCount`] if `count <= 0`.
    /// - [`Error::InsufficientSupply`] if the pool holds fewer than `count`
    ///   available keys.
    /// - [`Error::StoreUnavailable`] if the backend fails.
    /// - [`Error::Timeout`] if the repository does not answer within the
    ///   budget.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn allocate(&self, count: i64) -> Result<Vec<Key>> {
        let result = match tokio::time::timeout(self.timeout, self.repo.get_keys(count)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                after: self.timeout,
            }),
        };

        #[cfg(feature = "tracing")]
        match &result {
            Ok(keys) => tracing::debug!("Allocated {} keys", keys.len()),
            Err(e) => tracing::warn!("Allocation of {count} keys failed: {e}"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryRepository;

    /// Never answers `get_keys`.
    struct StalledRepository;

    impl Repository for StalledRepository {
        async fn key_exists(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }

        async fn write_key(&self, _key: Key) -> Result<()> {
            Ok(())
        }

        async fn get_keys(&self, _count: i64) -> Result<Vec<Key>> {
            std::future::pending().await
        }
    }

    async fn seeded(keys: usize) -> Arc<MemoryRepository> {
        let repo = Arc::new(MemoryRepository::new());
        for i in 0..keys {
            repo.write_key(format!("k{i:03}")).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn allocates_exact_count() {
        let repo = seeded(10).await;
        let allocator = BatchAllocator::new(Arc::clone(&repo));
        assert_eq!(allocator.timeout(), BatchAllocator::<MemoryRepository>::DEFAULT_TIMEOUT);

        let keys = allocator.allocate(4).await.unwrap();

        assert_eq!(keys.len(), 4);
        assert_eq!(repo.available_len(), 6);
        assert!(keys.iter().all(|k| repo.is_used(k)));
    }

    #[tokio::test]
    async fn repository_errors_pass_through() {
        let repo = seeded(2).await;
        let allocator = BatchAllocator::new(Arc::clone(&repo));

        assert_eq!(
            allocator.allocate(0).await,
            Err(Error::InvalidCount { count: 0 })
        );
        assert_eq!(
            allocator.allocate(3).await,
            Err(Error::InsufficientSupply {
                requested: 3,
                available: 2
            })
        );
        repo.set_unavailable(true);
        assert!(matches!(
            allocator.allocate(1).await,
            Err(Error::StoreUnavailable { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_repository_times_out() {
        let allocator =
            BatchAllocator::with_timeout(Arc::new(StalledRepository), Duration::from_millis(50));
        assert_eq!(allocator.timeout(), Duration::from_millis(50));

        assert_eq!(
            allocator.allocate(1).await,
            Err(Error::Timeout {
                after: Duration::from_millis(50)
            })
        );
    }
}
