//! gRPC service implementation for batch key allocation.
//!
//! This module defines [`KeyService`], the concrete implementation of the
//! [`KeyGenerationService`] gRPC service defined in the protobuf schema. Each
//! `GetKeyMetadata` call moves a batch of keys out of the pre-filled pool and
//! returns them to the caller.
//!
//! ## Responsibilities
//!
//! - Validate incoming requests and enforce the per-request limit.
//! - Allocate from the shared [`KeyPool`] within its time budget.
//! - Map pool failures onto gRPC status codes.
//! - Refuse new work and drain in-flight requests on shutdown.

use crate::server::{
    config::ServerConfig,
    service::backend::Backend,
    telemetry::{
        decrement_requests_inflight, increment_allocation_errors, increment_keys_allocated,
        increment_requests, increment_requests_inflight, record_allocation_duration,
    },
};
use kgs_tonic_core::{
    Error,
    kgs::KeyPool,
    proto::{
        GetKeyMetadataRequest, GetKeyMetadataResponse,
        key_generation_service_server::KeyGenerationService,
    },
};
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{Duration, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

/// gRPC front end of a filled key pool.
///
/// Cloning is cheap; all clones share the pool, the shutdown token, and the
/// in-flight counter.
#[derive(Clone)]
pub struct KeyService {
    config: ServerConfig,
    pool: Arc<KeyPool<Backend>>,
    shutdown_token: CancellationToken,
    inflight: Arc<AtomicUsize>,
}

/// Tracks one in-flight request for the lifetime of the guard.
struct InflightGuard {
    inflight: Arc<AtomicUsize>,
}

impl InflightGuard {
    fn new(inflight: &Arc<AtomicUsize>) -> Self {
        inflight.fetch_add(1, Ordering::AcqRel);
        increment_requests_inflight();
        Self {
            inflight: Arc::clone(inflight),
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_requests_inflight();
    }
}

impl KeyService {
    /// Wraps an already filled pool.
    pub fn new(config: ServerConfig, pool: KeyPool<Backend>) -> Self {
        Self {
            config,
            pool: Arc::new(pool),
            shutdown_token: CancellationToken::new(),
            inflight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of requests currently being served.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    /// Stops accepting requests and waits for in-flight ones to finish.
    ///
    /// Requests arriving after this call are rejected with `UNAVAILABLE`. The
    /// wait is bounded by the configured shutdown timeout; requests still
    /// running past it are left to the transport's own shutdown.
    pub async fn shutdown(&self) -> Result<(), Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Refusing new requests");
        self.shutdown_token.cancel();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Waiting up to {:?} for {} in-flight requests",
            self.config.shutdown_timeout,
            self.inflight()
        );

        let drain = timeout(self.config.shutdown_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        match drain {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::info!("All in-flight requests completed");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Shutdown timeout reached with {} requests still in flight",
                    self.inflight()
                );
            }
        }

        Ok(())
    }

    fn validate(&self, required_keys: i64) -> Result<(), Error> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        // Non-positive counts are the pool's to reject.
        if required_keys > 0 && required_keys as u64 > self.config.max_keys_per_request {
            return Err(Error::InvalidRequest {
                reason: format!(
                    "Requested {} keys, exceeds maximum allowed ({})",
                    required_keys, self.config.max_keys_per_request
                ),
            });
        }

        Ok(())
    }
}

#[tonic::async_trait]
impl KeyGenerationService for KeyService {
    /// Allocates `required_keys` keys from the pool.
    ///
    /// On success the response carries exactly `required_keys` distinct keys
    /// and `success = true`. Failures are reported as gRPC status codes and
    /// hand out no keys. Rejected requests leave the pool untouched; after a
    /// timeout a backend that could not cancel its transaction may still have
    /// retired the batch.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(required_keys = req.get_ref().required_keys)))]
    async fn get_key_metadata(
        &self,
        req: Request<GetKeyMetadataRequest>,
    ) -> Result<Response<GetKeyMetadataResponse>, Status> {
        let required_keys = req.into_inner().required_keys;
        increment_requests();

        // Registered before the shutdown check so the drain in `shutdown`
        // either sees this request or this request sees the cancellation.
        let _guard = InflightGuard::new(&self.inflight);
        if let Err(e) = self.validate(required_keys) {
            increment_allocation_errors();
            return Err(e.into());
        }

        let start = std::time::Instant::now();

        match self.pool.get_keys(required_keys).await {
            Ok(keys) => {
                record_allocation_duration(start.elapsed().as_secs_f64() * 1_000.0);
                increment_keys_allocated(keys.len() as u64);
                Ok(Response::new(GetKeyMetadataResponse {
                    keys,
                    success: true,
                }))
            }
            Err(e) => {
                increment_allocation_errors();
                #[cfg(feature = "tracing")]
                tracing::warn!("Allocation failed: {}", e);
                Err(Error::from(e).into())
            }
        }
    }
}
