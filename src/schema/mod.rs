//! Schema module - Configuration, target and result types for the surface search.

mod config;
mod evolution;
mod target;

pub use config::*;
pub use evolution::*;
pub use target::*;
