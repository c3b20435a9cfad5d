#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can access `kgs` via
// `kgs_tonic_core::kgs`
pub use kgs;
