//! Evolutionary search for surfaces that reproduce target force/area checkpoints.
//!
//! # Overview
//!
//! - **Surface** (`surface`): the genome (heights, radii) and its random
//!   construction, crossover and mutation operators
//! - **Fitness** (`fitness`): normalized squared error against the targets
//! - **Search** (`search`): truncation-selection GA over a rayon worker pool
//! - **Report** (`report`): height statistics and JSON export for sinks
//!
//! # Example
//!
//! ```rust,no_run
//! use asperity_search::compute::evolution::optimize;
//! use asperity_search::schema::{EvolutionConfig, TargetPoint};
//!
//! let targets = [TargetPoint::new(18_384_800_256.0, 149_053.0)];
//! let config = EvolutionConfig {
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let (heights, trajectory) = optimize(&targets, config).unwrap();
//! println!("{} asperities, final score {:?}", heights.len(), trajectory.last());
//! ```

mod fitness;
mod report;
mod search;
mod surface;

pub use fitness::{FitnessEvaluator, WORST_SCORE, score_curve};
pub use report::{CurveExport, HeightStatistics, SurfaceReport};
pub use search::{EvolutionEngine, EvolutionError, optimize};
pub use surface::{HeightSampler, Surface, SurfaceRng};
