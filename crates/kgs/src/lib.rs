#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod allocator;
mod error;
mod filler;
mod key;
mod pool;
mod repository;

pub use crate::allocator::*;
pub use crate::error::*;
pub use crate::filler::{FillConfig, FillReport, PoolFiller};
pub use crate::key::*;
pub use crate::pool::*;
pub use crate::repository::*;
