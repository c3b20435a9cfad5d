mod generator;
mod interface;
mod thread_random;

pub use generator::*;
pub use interface::*;
pub use thread_random::*;
