//! Error types for the key generation service.
//!
//! This module defines the central `Error` enum, which captures all reportable
//! error cases of the service. It implements `From<Error>` for
//! `tonic::Status` to propagate failures to gRPC clients with appropriate
//! status codes and messages.
//!
//! ## Error Cases
//! - `Pool`: The key pool rejected or failed the operation (see
//!   [`kgs::Error`]).
//! - `InvalidRequest`: The client request was malformed or exceeded bounds.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the key generation service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The key pool failed the operation.
    #[error("Pool error: {0}")]
    Pool(#[from] kgs::Error),

    /// The client request was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Pool(e) => pool_status(e),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}

fn pool_status(err: kgs::Error) -> Status {
    use kgs::Error as E;

    let message = err.to_string();
    match err {
        E::InvalidCount { .. }
        | E::InvalidLength { .. }
        | E::InvalidConcurrency
        | E::PoolTooLarge { .. } => Status::invalid_argument(message),
        E::InsufficientSupply { .. } => Status::resource_exhausted(message),
        E::StoreUnavailable { .. } => Status::unavailable(message),
        E::Timeout { .. } => Status::deadline_exceeded(message),
        // Collisions are resolved inside fills and never reach a client.
        E::DuplicateKey { .. } => Status::internal(message),
        _ => Status::internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use tonic::Code;

    fn code(err: impl Into<Error>) -> Code {
        Status::from(err.into()).code()
    }

    #[test]
    fn pool_errors_map_to_status_codes() {
        assert_eq!(
            code(kgs::Error::InvalidCount { count: -3 }),
            Code::InvalidArgument
        );
        assert_eq!(
            code(kgs::Error::InsufficientSupply {
                requested: 5,
                available: 1
            }),
            Code::ResourceExhausted
        );
        assert_eq!(code(kgs::Error::store("down")), Code::Unavailable);
        assert_eq!(
            code(kgs::Error::Timeout {
                after: Duration::from_secs(2)
            }),
            Code::DeadlineExceeded
        );
        assert_eq!(
            code(kgs::Error::DuplicateKey {
                key: "abcd".to_string()
            }),
            Code::Internal
        );
    }

    #[test]
    fn service_errors_map_to_status_codes() {
        assert_eq!(
            code(Error::InvalidRequest {
                reason: "too many".to_string()
            }),
            Code::InvalidArgument
        );
        assert_eq!(code(Error::ServiceShutdown), Code::Unavailable);
    }

    #[test]
    fn status_message_carries_pool_context() {
        let status = Status::from(Error::from(kgs::Error::InsufficientSupply {
            requested: 5,
            available: 1,
        }));
        assert_eq!(
            status.message(),
            "insufficient supply: requested 5 keys, 1 available"
        );
    }
}
