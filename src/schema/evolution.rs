//! Evolution configuration and result types for the surface search.
//!
//! This module provides types for configuring the generational search that
//! fits an asperity height distribution to target force/area checkpoints.

use serde::{Deserialize, Serialize};

use super::{ConfigError, ContactConfig, SurfaceConstraints};

/// Top-level configuration for a surface search.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionConfig {
    /// Forward contact-model parameters.
    #[serde(default)]
    pub contact: ContactConfig,
    /// Genome shape and gene ranges.
    #[serde(default)]
    pub surface: SurfaceConstraints,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Crossover and mutation settings.
    #[serde(default)]
    pub genetic: GeneticConfig,
    /// Scoring strategy.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Worker pool settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of surfaces in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once the best score drops below this tolerance.
    #[serde(default)]
    pub target_score: Option<f64>,
    /// Stop if the best score has not improved for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            target_score: None,
            stagnation_limit: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    500
}

/// Crossover and mutation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Per-gene mutation probability (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// How a mutated gene gets its new value.
    #[serde(default)]
    pub mutation: MutationPolicy,
    /// How a child inherits genes from its two parents.
    #[serde(default)]
    pub crossover: CrossoverMethod,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            mutation_rate: default_mutation_rate(),
            mutation: MutationPolicy::default(),
            crossover: CrossoverMethod::default(),
        }
    }
}

fn default_mutation_rate() -> f64 {
    0.05
}

/// Gene replacement policy for mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum MutationPolicy {
    /// Fresh uniform draw over the full gene range.
    #[default]
    Redraw,
    /// Uniform integer offset in `[-amplitude, amplitude]`, clamped to the
    /// gene range. Radii move by whole steps.
    Perturb { amplitude: u32 },
}

/// Gene inheritance scheme for crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum CrossoverMethod {
    /// Draw one threshold `t` per child, then one uniform value per gene:
    /// below `t` inherits from the first parent, otherwise from the second.
    #[default]
    Threshold,
    /// Draw one cut index; genes before it come from the first parent, the
    /// rest from the second.
    CutIndex,
}

/// Scoring strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// `true`: sum of per-checkpoint error terms (first term weight 1, the
    /// rest accumulated). `false`: mean of the terms.
    #[serde(default = "default_weighted")]
    pub weighted: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weighted: default_weighted(),
        }
    }
}

fn default_weighted() -> bool {
    true
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvaluationConfig {
    /// Number of parallel workers (0 = available parallelism minus one).
    #[serde(default)]
    pub parallel_workers: usize,
}

impl EvaluationConfig {
    /// Resolve the worker count, leaving one core free when auto-detecting.
    pub fn resolved_workers(&self) -> usize {
        if self.parallel_workers > 0 {
            return self.parallel_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }
}

// ============================================================================
// Progress and results
// ============================================================================

/// Progress report emitted after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generations completed.
    pub generation: usize,
    /// Generation budget.
    pub total_generations: usize,
    /// Best score seen so far.
    pub best_score: f64,
    /// Best score in the current population.
    pub generation_best: f64,
    /// Mean score of the current population.
    pub avg_score: f64,
    /// Generations since the last improvement.
    pub stagnation_count: usize,
}

/// A surface in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    /// Asperity heights (µm).
    pub heights: Vec<f64>,
    /// Curvature radii (µm).
    pub radii: Vec<f64>,
    /// Score (lower is better), `None` if the surface was never evaluated.
    pub score: Option<f64>,
}

/// Per-generation history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best score per generation, starting with the initial population.
    pub best_score: Vec<f64>,
    /// Mean score per generation.
    pub avg_score: Vec<f64>,
    /// Standard deviation of scores per generation.
    pub score_std: Vec<f64>,
}

/// Final result of a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best surface found.
    pub best: SurfaceSnapshot,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations run.
    pub generations: usize,
    /// Surfaces scored.
    pub total_evaluations: u64,
    /// Best score achieved.
    pub best_score: f64,
    /// Mean score of the final population.
    pub final_avg_score: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Best score fell below the tolerance.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// Caller cancelled.
    Cancelled,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Mutation rate must be within [0, 1], got {0}")]
    InvalidMutationRate(f64),
    #[error("Perturbation amplitude must be non-zero")]
    InvalidPerturbation,
    #[error("Target score must be non-negative and finite, got {0}")]
    InvalidTargetScore(f64),
    #[error("Surface/contact config validation failed: {0}")]
    Config(#[from] ConfigError),
}

impl EvolutionConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.contact.validate()?;
        self.surface.validate()?;

        if self.population.size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }

        let rate = self.genetic.mutation_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(EvolutionConfigError::InvalidMutationRate(rate));
        }

        if let MutationPolicy::Perturb { amplitude: 0 } = self.genetic.mutation {
            return Err(EvolutionConfigError::InvalidPerturbation);
        }

        if let Some(target) = self.population.target_score
            && !(target.is_finite() && target >= 0.0)
        {
            return Err(EvolutionConfigError::InvalidTargetScore(target));
        }

        Ok(())
    }
}
