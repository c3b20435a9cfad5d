//! gRPC service implementation and storage selection.
//!
//! This module contains the client-facing `GetKeyMetadata` handler and the
//! storage backend it allocates from. It owns request validation, error
//! mapping, and shutdown coordination.
//!
//! ## Structure
//!
//! - [`backend`] - Runtime choice between the in-memory and SQLite stores.
//! - [`handler`] - gRPC service entry point (`KeyService`).

pub mod backend;
pub mod handler;
