//! A filled key pool ready to serve allocations.

use crate::{
    BatchAllocator, FillConfig, FillReport, Key, PoolFiller, RandSource, Repository, Result,
    ThreadRandom,
};
use core::time::Duration;
use std::sync::Arc;

/// Parameters for building a [`KeyPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// How the pool is filled at construction.
    pub fill: FillConfig,
    /// Time budget for each allocation.
    pub allocation_timeout: Duration,
}

impl PoolConfig {
    /// Creates a config with the default allocation budget.
    pub const fn new(fill: FillConfig) -> Self {
        Self {
            fill,
            allocation_timeout: Duration::from_secs(2),
        }
    }

    /// Sets the allocation budget.
    #[must_use]
    pub const fn with_allocation_timeout(mut self, timeout: Duration) -> Self {
        self.allocation_timeout = timeout;
        self
    }
}

/// The key generation service core: a repository filled at construction,
/// then drained in batches.
///
/// # Example
/// ```
/// use kgs::{FillConfig, KeyPool, MemoryRepository, PoolConfig};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> kgs::Result<()> {
/// let repo = Arc::new(MemoryRepository::new());
/// let pool = KeyPool::build(repo, PoolConfig::new(FillConfig::new(8, 4))).await?;
///
/// let keys = pool.get_keys(3).await?;
/// assert_eq!(keys.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct KeyPool<R> {
    allocator: BatchAllocator<R>,
    report: FillReport,
}

impl<R: Repository + 'static> KeyPool<R> {
    /// Fills `repo` with `config.fill.pool_size` fresh keys, then returns a
    /// pool ready to allocate.
    ///
    /// # Errors
    ///
    /// Returns the fill's fatal error, if any. Keys committed before the
    /// failure remain in `repo`.
    pub async fn build(repo: Arc<R>, config: PoolConfig) -> Result<Self> {
        Self::build_with_rand(repo, config, ThreadRandom).await
    }

    /// Like [`Self::build`], with an explicit randomness source.
    ///
    /// # Errors
    ///
    /// See [`Self::build`].
    pub async fn build_with_rand<G>(repo: Arc<R>, config: PoolConfig, rng: G) -> Result<Self>
    where
        G: RandSource + Clone + Send + Sync + 'static,
    {
        let filler = PoolFiller::with_rand(Arc::clone(&repo), config.fill, rng)?;
        let report = filler.fill().await?;
        Ok(Self {
            allocator: BatchAllocator::with_timeout(repo, config.allocation_timeout),
            report,
        })
    }

    /// Allocates exactly `count` keys. See [`BatchAllocator::allocate`].
    ///
    /// # Errors
    ///
    /// See [`BatchAllocator::allocate`].
    pub async fn get_keys(&self, count: i64) -> Result<Vec<Key>> {
        self.allocator.allocate(count).await
    }

    /// Outcome of the construction-time fill.
    pub const fn fill_report(&self) -> FillReport {
        self.report
    }

    /// The underlying repository.
    pub const fn repository(&self) -> &Arc<R> {
        self.allocator.repository()
    }
}
