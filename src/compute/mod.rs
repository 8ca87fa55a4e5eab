//! Compute module - Contact mechanics and evolutionary search.

mod contact;

pub mod evolution;

pub use contact::*;
