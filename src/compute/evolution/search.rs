//! Generational search over surface genomes.
//!
//! Each generation ranks the population, keeps the better half, and refills it
//! with two children per adjacent pair of survivors. Creation and scoring of
//! surfaces fan out over a fixed rayon pool; every task gets its own RNG
//! seeded from the master stream before the fan-out, so a fixed seed gives
//! the same run regardless of worker count.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionProgress, EvolutionResult,
    EvolutionStats, StopReason, SurfaceSnapshot, TargetError, TargetPoint, TargetSet,
};

use super::fitness::{FitnessEvaluator, WORST_SCORE};
use super::surface::{HeightSampler, Surface, SurfaceRng};

/// Errors raised before the generation loop starts.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Invalid target set: {0}")]
    Target(#[from] TargetError),
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    rng: SurfaceRng,
    seed: u64,
    evaluator: FitnessEvaluator,
    sampler: HeightSampler,
    pool: rayon::ThreadPool,
    population: Vec<Surface>,
    history: EvolutionHistory,
    generation: usize,
    best_score: f64,
    stagnation_count: usize,
    evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine. The configuration is validated here.
    pub fn new(config: EvolutionConfig, targets: TargetSet) -> Result<Self, EvolutionError> {
        config.validate()?;
        let sampler = HeightSampler::new(&config.surface.height_distribution)
            .map_err(EvolutionConfigError::from)?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.evaluation.resolved_workers())
            .thread_name(|i| format!("surface-eval-{i}"))
            .build()?;
        let evaluator = FitnessEvaluator::from_config(&config, targets);

        Ok(Self {
            rng: SurfaceRng::new(seed),
            seed,
            evaluator,
            sampler,
            pool,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            best_score: f64::INFINITY,
            stagnation_count: 0,
            evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Get cancellation handle. Checked between generations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Master seed of this run.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current population, best first once scored.
    pub fn population(&self) -> &[Surface] {
        &self.population
    }

    /// Best surface of the current population.
    pub fn best(&self) -> Option<&Surface> {
        self.population.first()
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Create and score a random population.
    pub fn initialize(&mut self) {
        self.generation = 0;
        self.best_score = f64::INFINITY;
        self.stagnation_count = 0;
        self.evaluations = 0;
        self.history = EvolutionHistory::default();

        let seeds: Vec<u64> = (0..self.config.population.size)
            .map(|_| self.rng.next_seed())
            .collect();

        let constraints = &self.config.surface;
        let sampler = &self.sampler;
        let evaluator = &self.evaluator;
        self.population = self.pool.install(|| {
            seeds
                .par_iter()
                .map(|&seed| {
                    SurfaceRng::new(seed)
                        .sample_surface(constraints, sampler)
                        .evaluated(evaluator)
                })
                .collect()
        });

        self.evaluations += self.population.len() as u64;
        self.record_generation();
    }

    /// Run a single generation: select, recombine, mutate, score.
    fn step_generation(&mut self) {
        if self.population.is_empty() {
            self.initialize();
            return;
        }
        let size = self.config.population.size;

        // Population is ranked by record_generation; keep the better half.
        let keep = size.div_ceil(2).min(self.population.len());
        self.population.truncate(keep);

        let children = self.breed_children(size - keep);
        self.evaluations += children.len() as u64;
        self.population.extend(children);

        self.generation += 1;
        self.record_generation();
    }

    /// Breed `needed` scored children from the current (ranked) population.
    ///
    /// Pair `p` is survivors `2p` and `2p + 1`, wrapping around the survivor
    /// count, and yields the children `(2p, 2p + 1)` and `(2p + 1, 2p)` in
    /// that order.
    fn breed_children(&mut self, needed: usize) -> Vec<Surface> {
        let keep = self.population.len();
        if keep == 0 {
            return Vec::new();
        }
        let jobs: Vec<(usize, usize, u64)> = (0..needed.div_ceil(2))
            .map(|p| ((2 * p) % keep, (2 * p + 1) % keep, self.rng.next_seed()))
            .collect();

        let parents = &self.population;
        let genetic = &self.config.genetic;
        let constraints = &self.config.surface;
        let evaluator = &self.evaluator;

        let mut children: Vec<Surface> = self.pool.install(|| {
            jobs.par_iter()
                .flat_map_iter(|&(i, j, seed)| {
                    let mut rng = SurfaceRng::new(seed);
                    let mut breed = |first: &Surface, second: &Surface| {
                        let child =
                            rng.crossover(first, second, genetic.crossover, constraints);
                        rng.mutate(child, genetic.mutation_rate, &genetic.mutation, constraints)
                            .evaluated(evaluator)
                    };
                    let a = breed(&parents[i], &parents[j]);
                    let b = breed(&parents[j], &parents[i]);
                    [a, b]
                })
                .collect()
        });

        children.truncate(needed);
        children
    }

    /// Rank the population and append this generation to the history.
    fn record_generation(&mut self) {
        self.population
            .sort_by(|a, b| rank_score(a).total_cmp(&rank_score(b)));

        let gen_best = self.population.first().map_or(WORST_SCORE, rank_score);
        if gen_best < self.best_score {
            self.best_score = gen_best;
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        let scores: Vec<f64> = self
            .population
            .iter()
            .map(rank_score)
            .filter(|&s| s < WORST_SCORE)
            .collect();
        let degenerate = self.population.len() - scores.len();
        if degenerate > 0 {
            warn!(
                "generation {}: {} of {} surfaces have a degenerate response",
                self.generation,
                degenerate,
                self.population.len()
            );
        }

        let (avg, std) = if scores.is_empty() {
            (WORST_SCORE, 0.0)
        } else {
            let n = scores.len() as f64;
            let avg = scores.iter().sum::<f64>() / n;
            let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / n;
            (avg, variance.sqrt())
        };

        self.history.best_score.push(gen_best);
        self.history.avg_score.push(avg);
        self.history.score_std.push(std);

        debug!(
            "generation {}: best={:.6e} avg={:.6e} stagnation={}",
            self.generation, gen_best, avg, self.stagnation_count
        );
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.population.max_generations,
            best_score: self.best_score,
            generation_best: self.history.best_score.last().copied().unwrap_or(WORST_SCORE),
            avg_score: self.history.avg_score.last().copied().unwrap_or(WORST_SCORE),
            stagnation_count: self.stagnation_count,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(tolerance) = self.config.population.target_score
            && self.best_score < tolerance
        {
            return Some(StopReason::TargetReached);
        }

        if self.generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> EvolutionResult
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();

        info!(
            "starting surface search: population={} asperities={} generations={} workers={} seed={}",
            self.config.population.size,
            self.config.surface.asperity_count,
            self.config.population.max_generations,
            self.pool.current_num_threads(),
            self.seed
        );

        self.initialize();
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation();
            callback(&self.progress());
        };

        let elapsed = start_time.elapsed().as_secs_f64();

        info!(
            "surface search stopped after {} generations ({:?}): best={:.6e} in {:.2}s",
            self.generation, stop_reason, self.best_score, elapsed
        );

        let best = self
            .best()
            .map(Surface::snapshot)
            .unwrap_or_else(|| SurfaceSnapshot {
                heights: Vec::new(),
                radii: Vec::new(),
                score: None,
            });

        EvolutionResult {
            best,
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_score: self.best_score,
                final_avg_score: self.history.avg_score.last().copied().unwrap_or(WORST_SCORE),
                elapsed_seconds: elapsed,
                stop_reason,
            },
            history: self.history.clone(),
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}

fn rank_score(surface: &Surface) -> f64 {
    match surface.score() {
        Some(s) if !s.is_nan() => s,
        _ => WORST_SCORE,
    }
}

/// Fit a height distribution to the targets.
///
/// Returns the best surface's heights and the best score of every
/// generation, starting with the initial population.
pub fn optimize(
    targets: &[TargetPoint],
    config: EvolutionConfig,
) -> Result<(Vec<f64>, Vec<f64>), EvolutionError> {
    let targets = TargetSet::new(targets.to_vec())?;
    let mut engine = EvolutionEngine::new(config, targets)?;
    let result = engine.run();
    Ok((result.best.heights, result.history.best_score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        ContactConfig, CrossoverMethod, EvaluationConfig, GeneticConfig, MutationPolicy,
        PopulationConfig, RadiusMode, SurfaceConstraints,
    };

    fn targets() -> TargetSet {
        TargetSet::new(vec![TargetPoint::new(18_384_800_256.0, 149_053.0)]).unwrap()
    }

    fn small_config(size: usize, generations: usize) -> EvolutionConfig {
        EvolutionConfig {
            contact: ContactConfig {
                samples: 200,
                ..Default::default()
            },
            surface: SurfaceConstraints {
                asperity_count: 16,
                ..Default::default()
            },
            population: PopulationConfig {
                size,
                max_generations: generations,
                ..Default::default()
            },
            evaluation: EvaluationConfig {
                parallel_workers: 2,
            },
            random_seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_evolution_engine_creation() {
        let mut engine = EvolutionEngine::new(small_config(10, 5), targets()).unwrap();
        engine.initialize();

        assert_eq!(engine.population().len(), 10);
        assert!(engine.population().iter().all(|s| s.score().is_some()));
        assert_eq!(engine.seed(), 42);
    }

    #[test]
    fn test_population_ranked_after_initialize() {
        let mut engine = EvolutionEngine::new(small_config(12, 1), targets()).unwrap();
        engine.initialize();

        let scores: Vec<f64> = engine.population().iter().map(rank_score).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_population_size_maintained() {
        for size in [2, 3, 6, 7, 10] {
            let mut engine = EvolutionEngine::new(small_config(size, 4), targets()).unwrap();
            engine.initialize();
            for _ in 0..4 {
                engine.step_generation();
                assert_eq!(engine.population().len(), size);
            }
        }
    }

    /// Unscored surface whose every height is `10 * (k + 1)`.
    fn marked(k: usize) -> Surface {
        Surface::with_fixed_radius(vec![10.0 * (k + 1) as f64; 16], 526.0)
    }

    #[test]
    fn test_children_pair_adjacent_survivors() {
        let mut config = small_config(10, 1);
        config.genetic.mutation_rate = 0.0;
        config.genetic.crossover = CrossoverMethod::CutIndex;
        let mut engine = EvolutionEngine::new(config, targets()).unwrap();

        // Five survivors: the last pair wraps to (4, 0).
        engine.population = (0..5).map(marked).collect();
        let children = engine.breed_children(5);
        assert_eq!(children.len(), 5);

        let height = |k: usize| 10.0 * (k + 1) as f64;
        for (c, child) in children.iter().enumerate() {
            let p = c / 2;
            let (i, j) = ((2 * p) % 5, (2 * p + 1) % 5);
            let (first, second) = if c % 2 == 0 { (i, j) } else { (j, i) };

            // Cut crossover: a prefix from `first`, the rest from `second`.
            let genes = child.heights();
            let split = genes
                .iter()
                .position(|&h| h != height(first))
                .unwrap_or(genes.len());
            assert!(
                genes[split..].iter().all(|&h| h == height(second)),
                "child {c} is not ({first}, {second}): {genes:?}"
            );
            assert!(child.score().is_some());
        }

        assert!(children[4]
            .heights()
            .iter()
            .all(|&h| h == height(4) || h == height(0)));
    }

    #[test]
    fn test_threshold_children_use_only_their_pair() {
        let mut config = small_config(10, 1);
        config.genetic.mutation_rate = 0.0;
        let mut engine = EvolutionEngine::new(config, targets()).unwrap();

        for _ in 0..20 {
            engine.population = (0..5).map(marked).collect();
            let children = engine.breed_children(5);
            for (c, child) in children.iter().enumerate() {
                let p = c / 2;
                let allowed = [
                    10.0 * ((2 * p) % 5 + 1) as f64,
                    10.0 * ((2 * p + 1) % 5 + 1) as f64,
                ];
                assert!(child.heights().iter().all(|h| allowed.contains(h)));
            }
        }
    }

    #[test]
    fn test_ranking_keeps_tied_surfaces_in_order() {
        let mut engine = EvolutionEngine::new(small_config(7, 1), targets()).unwrap();
        let scored = marked(5).evaluated(engine.evaluator());

        engine.population = vec![marked(0), marked(1), scored, marked(2), marked(3)];
        engine.record_generation();
        let order: Vec<f64> = engine.population().iter().map(|s| s.heights()[0]).collect();
        assert_eq!(order, vec![60.0, 10.0, 20.0, 30.0, 40.0]);

        // All unscored: ties throughout, survivors are the first four in input order.
        engine.population = (0..7).map(marked).collect();
        engine.record_generation();
        engine.step_generation();

        assert_eq!(engine.population().len(), 7);
        let tail: Vec<f64> = engine.population()[3..]
            .iter()
            .map(|s| s.heights()[0])
            .collect();
        assert_eq!(tail, vec![10.0, 20.0, 30.0, 40.0]);
        assert!(engine.population()[3..].iter().all(|s| s.score().is_none()));
    }

    #[test]
    fn test_evolution_run() {
        let mut engine = EvolutionEngine::new(small_config(8, 3), targets()).unwrap();
        let result = engine.run();

        assert_eq!(result.stats.generations, 3);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.history.best_score.len(), 4);
        assert_eq!(result.best.heights.len(), 16);
        assert!(result.stats.best_score >= 0.0);
        assert_eq!(result.best.score, Some(result.stats.best_score));
    }

    #[test]
    fn test_best_score_never_worsens() {
        let mut config = small_config(10, 30);
        config.genetic = GeneticConfig {
            mutation_rate: 0.2,
            mutation: MutationPolicy::Perturb { amplitude: 5 },
            ..Default::default()
        };
        let mut engine = EvolutionEngine::new(config, targets()).unwrap();
        let result = engine.run();

        assert!(result.history.best_score.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let run = |workers: usize| {
            let mut config = small_config(9, 6);
            config.surface.radius = RadiusMode::variable_reference();
            config.evaluation.parallel_workers = workers;
            EvolutionEngine::new(config, targets()).unwrap().run()
        };

        let a = run(1);
        let b = run(3);
        assert_eq!(a.best, b.best);
        assert_eq!(a.history.best_score, b.history.best_score);
    }

    #[test]
    fn test_cancellation() {
        let mut engine = EvolutionEngine::new(small_config(5, 100), targets()).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_target_score_stops_early() {
        let mut config = small_config(6, 100);
        config.population.target_score = Some(1.0e300);
        let mut engine = EvolutionEngine::new(config, targets()).unwrap();

        let result = engine.run();
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_stagnation_limit() {
        let mut config = small_config(4, 1_000);
        config.genetic.mutation_rate = 0.0;
        config.population.stagnation_limit = Some(3);
        let mut engine = EvolutionEngine::new(config, targets()).unwrap();

        let result = engine.run();
        assert!(result.stats.generations < 1_000);
        assert_eq!(result.stats.stop_reason, StopReason::Stagnation);
    }

    #[test]
    fn test_invalid_targets_rejected_before_run() {
        let err = optimize(&[], small_config(4, 1)).unwrap_err();
        assert!(matches!(err, EvolutionError::Target(TargetError::Empty)));

        let err = optimize(&[TargetPoint::new(0.0, 0.0)], small_config(4, 1)).unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::Target(TargetError::ZeroAnchor { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(4, 1);
        config.surface.height_bounds = (100, 10);
        assert!(matches!(
            EvolutionEngine::new(config, targets()),
            Err(EvolutionError::Config(_))
        ));
    }

    #[test]
    fn test_reference_scenario() {
        let config = EvolutionConfig {
            contact: ContactConfig {
                samples: 1_000,
                ..Default::default()
            },
            surface: SurfaceConstraints {
                asperity_count: 64,
                height_bounds: (0, 120),
                radius: RadiusMode::Fixed { radius: 526.0 },
                ..Default::default()
            },
            population: PopulationConfig {
                size: 50,
                max_generations: 500,
                ..Default::default()
            },
            random_seed: Some(2023),
            ..Default::default()
        };

        let (heights, trajectory) =
            optimize(&[TargetPoint::new(18_384_800_256.0, 149_053.0)], config).unwrap();

        assert_eq!(heights.len(), 64);
        assert_eq!(trajectory.len(), 501);
        assert!(trajectory.windows(2).all(|w| w[1] <= w[0]));
        assert!(trajectory[500] < trajectory[0]);
    }
}
