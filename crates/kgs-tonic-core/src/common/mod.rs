//! Shared protocol definitions, types, and errors used by the key generation
//! server and its clients.
//!
//! ## Submodules
//!
//! - [`proto`] - Generated Protobuf service and message definitions.
//! - [`types`] - Key-related constants and defaults shared across the wire.
//! - [`Error`] - Service error type and its mapping to [`tonic::Status`].

mod error;
pub mod types;

pub use error::*;

/// gRPC service and message definitions generated from `proto/kgs.proto`.
///
/// ## Service
///
/// - `KeyGenerationService::GetKeyMetadata` - Allocates a batch of unique
///   keys.
///
/// ## Message Format
///
/// - [`GetKeyMetadataRequest`](proto::GetKeyMetadataRequest) - Carries
///   `required_keys`, the number of keys to allocate.
/// - [`GetKeyMetadataResponse`](proto::GetKeyMetadataResponse) - Carries the
///   allocated `keys` and a `success` flag.
///
/// ## Invariants
///
/// - A successful response holds exactly `required_keys` distinct keys.
/// - Failures are reported as a gRPC status, never as a partial batch.
pub mod proto {
    tonic::include_proto!("kgs");

    /// Encoded file descriptor set used to serve gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("kgs_descriptor");
}
