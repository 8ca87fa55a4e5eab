//! Asperity Search - Rough-surface synthesis from target contact response.
//!
//! This crate searches for an asperity height distribution whose elastic
//! contact response against a rigid flat passes through a set of target
//! (force, contact-area) checkpoints.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, target and result types
//! - `compute`: Greenwood–Williamson contact model and the evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use asperity_search::{
//!     compute::{evolution::EvolutionEngine, simulate},
//!     schema::{EvolutionConfig, TargetPoint, TargetSet},
//! };
//!
//! // Forward model for a single candidate
//! let heights = vec![12.0, 80.0, 45.0, 120.0];
//! let radii = vec![526.0; heights.len()];
//! let curve = simulate(&radii, &heights, 10_000).unwrap();
//! println!("Max force: {:e}", curve.forces[curve.len() - 1]);
//!
//! // Inverse search
//! let targets = TargetSet::new(vec![TargetPoint::new(18_384_800_256.0, 149_053.0)]).unwrap();
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), targets).unwrap();
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best score = {:.3e}",
//!         progress.generation, progress.best_score);
//! });
//! println!("Best heights: {:?}", result.best.heights);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, Surface, optimize};
pub use compute::{ContactModel, ResponseCurve, simulate};
pub use schema::{EvolutionConfig, TargetPoint, TargetSet};
