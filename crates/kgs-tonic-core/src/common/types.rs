//! # Common Key Types and Constants
//!
//! Keys travel over the wire as plain strings. Clients and servers agree on
//! the alphabet and length at deployment time; nothing about the key format is
//! negotiated per request.
//!
//! ## Re-exports
//!
//! - [`Key`] - A pooled key (`String`).
//! - [`ALPHABET`] - The 62 characters keys are drawn from.
//! - [`DEFAULT_KEY_LENGTH`] - Key length used when none is configured.
//! - [`key_space`] - Number of distinct keys of a given length.

pub use kgs::{ALPHABET, DEFAULT_KEY_LENGTH, Key, key_space};

/// Upper bound on keys returned by a single request when the server is not
/// configured otherwise.
pub const DEFAULT_MAX_KEYS_PER_REQUEST: u64 = 10_000;

/// Returns `true` if `key` has `length` characters, all from [`ALPHABET`].
///
/// Clients can use this to sanity-check keys received from a server running
/// the same deployment configuration.
pub fn is_well_formed(key: &str, length: usize) -> bool {
    key.len() == length && key.bytes().all(|b| ALPHABET.contains(&b))
}
