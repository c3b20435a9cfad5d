//! Concurrent pool filling.
//!
//! A [`PoolFiller`] grows the available set of a [`Repository`] by a target
//! number of keys. It spawns one logical worker per key; each worker loops on
//! generate, check, write until it commits exactly one new key. Workers run in
//! parallel on the Tokio runtime with no ordering between them.
//!
//! ## Bounded store pressure
//!
//! Every repository call is made while holding a permit from a semaphore of
//! size `max_concurrency`, so no more than that many calls are ever in flight
//! regardless of the pool size. Waiting workers park on the semaphore.
//!
//! ## Fail-fast
//!
//! Collisions are recovered inside the worker. Any other error is fatal: the
//! first one is recorded, the shared [`CancellationToken`] is cancelled so no
//! further repository calls start, and the remaining workers are aborted. Keys
//! committed before the failure stay in the pool.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod worker;

use crate::{Error, KeyGenerator, RandSource, Repository, Result, ThreadRandom, key_space};
use portable_atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinSet;
use worker::{FillShared, Worker, WorkerExit};

/// Parameters of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillConfig {
    /// Number of new keys to commit.
    pub pool_size: usize,
    /// Maximum number of simultaneous in-flight repository calls. Usually
    /// bounded by the backend's connection limit.
    pub max_concurrency: usize,
    /// Length of every generated key.
    pub key_length: usize,
}

impl FillConfig {
    /// Default concurrency ceiling, comfortably below PostgreSQL's default
    /// connection limit.
    pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

    /// Creates a config with [`Self::DEFAULT_MAX_CONCURRENCY`].
    pub const fn new(pool_size: usize, key_length: usize) -> Self {
        Self {
            pool_size,
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
            key_length,
        }
    }

    /// Sets the concurrency ceiling.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Checks the parameters without touching any store.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLength`] if `key_length` is zero.
    /// - [`Error::InvalidConcurrency`] if `max_concurrency` is zero.
    /// - [`Error::PoolTooLarge`] if `pool_size` exceeds the key space.
    pub fn validate(&self) -> Result<()> {
        if self.key_length == 0 {
            return Err(Error::InvalidLength {
                length: self.key_length,
            });
        }
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        if let Some(space) = key_space(self.key_length) {
            if self.pool_size as u64 > space {
                return Err(Error::PoolTooLarge {
                    pool_size: self.pool_size,
                    key_space: space,
                });
            }
        }
        Ok(())
    }
}

/// Outcome of a successful fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Keys committed by this fill. Always equals the configured pool size.
    pub keys_written: usize,
    /// Candidates discarded because they already existed or lost a write
    /// race.
    pub collisions: u64,
}

/// Fills a [`Repository`] with fresh unique keys.
pub struct PoolFiller<R, G = ThreadRandom> {
    repo: Arc<R>,
    config: FillConfig,
    rng: G,
}

impl<R> PoolFiller<R, ThreadRandom>
where
    R: Repository + 'static,
{
    /// Creates a filler that samples keys with [`ThreadRandom`].
    ///
    /// # Errors
    ///
    /// See [`FillConfig::validate`].
    pub fn new(repo: Arc<R>, config: FillConfig) -> Result<Self> {
        Self::with_rand(repo, config, ThreadRandom)
    }
}

impl<R, G> PoolFiller<R, G>
where
    R: Repository + 'static,
    G: RandSource + Clone + Send + Sync + 'static,
{
    /// Creates a filler with an explicit randomness source. Each worker gets
    /// its own clone.
    ///
    /// # Errors
    ///
    /// See [`FillConfig::validate`].
    pub fn with_rand(repo: Arc<R>, config: FillConfig, rng: G) -> Result<Self> {
        config.validate()?;
        Ok(Self { repo, config, rng })
    }

    /// The configuration this filler was built with.
    pub const fn config(&self) -> &FillConfig {
        &self.config
    }

    /// Commits `pool_size` new keys and waits for every worker.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by any worker, typically
    /// [`Error::StoreUnavailable`]. Collisions are never returned. On error,
    /// keys already committed remain in the repository; the fill is not
    /// retried.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(pool_size = self.config.pool_size, max_concurrency = self.config.max_concurrency)))]
    pub async fn fill(&self) -> Result<FillReport> {
        let FillConfig {
            pool_size,
            max_concurrency,
            key_length,
        } = self.config;

        if pool_size == 0 {
            return Ok(FillReport::default());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Starting fill of {pool_size} keys");

        let shared = Arc::new(FillShared::new(Arc::clone(&self.repo), max_concurrency));
        let mut workers = JoinSet::new();
        for id in 0..pool_size {
            let worker = Worker {
                id,
                shared: Arc::clone(&shared),
                generator: KeyGenerator::new(key_length, self.rng.clone())?,
            };
            workers.spawn(worker.run());
        }

        let mut keys_written = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(WorkerExit::Committed)) => keys_written += 1,
                Ok(Ok(WorkerExit::Cancelled)) => {}
                Ok(Err(_)) => break,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => {}
            }
        }

        if let Some(err) = shared.failure.get() {
            shared.cancel.cancel();
            workers.abort_all();
            #[cfg(feature = "tracing")]
            tracing::warn!("Fill aborted after committing {keys_written} of {pool_size} keys");
            return Err(err.clone());
        }

        let report = FillReport {
            keys_written,
            collisions: shared.collisions.load(Ordering::Relaxed),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Fill complete: {} keys, {} collisions",
            report.keys_written,
            report.collisions
        );

        Ok(report)
    }
}
