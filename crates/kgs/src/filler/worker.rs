use crate::{Error, KeyGenerator, RandSource, Repository, Result};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// How a fill worker finished without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// The worker committed exactly one new key.
    Committed,
    /// The fill was cancelled before this worker committed.
    Cancelled,
}

/// State shared by every worker of one fill.
pub(crate) struct FillShared<R> {
    pub(crate) repo: Arc<R>,
    /// Caps simultaneous in-flight repository calls.
    pub(crate) gate: Semaphore,
    pub(crate) cancel: CancellationToken,
    /// First fatal error wins; later ones are dropped.
    pub(crate) failure: OnceLock<Error>,
    pub(crate) collisions: AtomicU64,
}

impl<R> FillShared<R> {
    pub(crate) fn new(repo: Arc<R>, max_concurrency: usize) -> Self {
        Self {
            repo,
            gate: Semaphore::new(max_concurrency),
            cancel: CancellationToken::new(),
            failure: OnceLock::new(),
            collisions: AtomicU64::new(0),
        }
    }

    /// Records `err` as the fill's failure (if none is recorded yet) and
    /// cancels the remaining workers.
    pub(crate) fn abort(&self, err: Error) {
        #[cfg(feature = "tracing")]
        tracing::error!(error = %err, "aborting fill");
        let _ = self.failure.set(err);
        self.cancel.cancel();
    }
}

/// One logical fill worker: loops until it commits a single unique key.
pub(crate) struct Worker<R, G> {
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) id: usize,
    pub(crate) shared: Arc<FillShared<R>>,
    pub(crate) generator: KeyGenerator<G>,
}

impl<R, G> Worker<R, G>
where
    R: Repository,
    G: RandSource,
{
    /// Runs the generate / check / write loop.
    ///
    /// Collisions (an existing key or a lost write race) loop back to
    /// generation. Any other error is fatal: [`Self::guarded`] has already
    /// recorded it and cancelled the fill, and it is returned.
    pub(crate) async fn run(self) -> Result<WorkerExit> {
        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {} started", self.id);

        loop {
            let candidate = self.generator.generate();

            let exists = match self.guarded(|repo| repo.key_exists(&candidate)).await {
                None => return Ok(WorkerExit::Cancelled),
                Some(Ok(exists)) => exists,
                Some(Err(e)) => return Err(self.fail(e)),
            };
            if exists {
                self.collided(&candidate);
                continue;
            }

            let key = candidate.clone();
            match self.guarded(move |repo| repo.write_key(key)).await {
                None => return Ok(WorkerExit::Cancelled),
                Some(Ok(())) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {} committed {candidate}", self.id);
                    return Ok(WorkerExit::Committed);
                }
                Some(Err(e)) if e.is_collision() => self.collided(&candidate),
                Some(Err(e)) => return Err(self.fail(e)),
            }
        }
    }

    /// Runs one repository call while holding a concurrency permit.
    ///
    /// A fatal result aborts the fill before the permit is released, so no
    /// worker waiting on the gate can start a call after the failure. Returns
    /// `None` if the fill was cancelled before the call could start.
    async fn guarded<'a, F, Fut, T>(&'a self, op: F) -> Option<Result<T>>
    where
        F: FnOnce(&'a R) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = tokio::select! {
            biased;
            () = self.shared.cancel.cancelled() => return None,
            permit = self.shared.gate.acquire() => permit.ok()?,
        };
        if self.shared.cancel.is_cancelled() {
            return None;
        }
        let res = op(self.shared.repo.as_ref()).await;
        if let Err(e) = &res {
            if !e.is_collision() {
                self.shared.abort(e.clone());
            }
        }
        Some(res)
    }

    fn collided(&self, _candidate: &str) {
        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {} collided on {_candidate}, regenerating", self.id);
        self.shared.collisions.fetch_add(1, Ordering::Relaxed);
    }

    fn fail(&self, err: Error) -> Error {
        #[cfg(feature = "tracing")]
        tracing::debug!("Worker {} hit a fatal error: {err}", self.id);
        err
    }
}
