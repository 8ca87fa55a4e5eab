//! Surface genome and its genetic operators.
//!
//! A [`Surface`] is a value object: heights and radii are fixed once built,
//! and the operators on [`SurfaceRng`] always hand back a new surface.

use rand::prelude::*;
use rand_distr::Exp;

use crate::compute::{ContactError, ContactModel, ResponseCurve};
use crate::schema::{
    ConfigError, CrossoverMethod, HeightDistribution, MutationPolicy, RadiusMode,
    SurfaceConstraints, SurfaceSnapshot,
};

use super::fitness::FitnessEvaluator;

/// One candidate rough surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    heights: Vec<f64>,
    radii: Vec<f64>,
    score: Option<f64>,
}

impl Surface {
    /// Build an unscored surface from explicit genes.
    pub fn new(heights: Vec<f64>, radii: Vec<f64>) -> Result<Self, ContactError> {
        if heights.len() != radii.len() {
            return Err(ContactError::LengthMismatch {
                radii: radii.len(),
                heights: heights.len(),
            });
        }
        Ok(Self {
            heights,
            radii,
            score: None,
        })
    }

    /// Build an unscored surface whose asperities share one radius.
    pub fn with_fixed_radius(heights: Vec<f64>, radius: f64) -> Self {
        let radii = vec![radius; heights.len()];
        Self {
            heights,
            radii,
            score: None,
        }
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Number of asperities.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Score from the last [`Surface::evaluate`], if any.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Force/area response of this surface.
    pub fn response_curve(
        &self,
        model: &ContactModel,
        samples: usize,
    ) -> Result<ResponseCurve, ContactError> {
        model.response_curve(&self.radii, &self.heights, samples)
    }

    /// Score this surface against the evaluator's targets and cache it.
    pub fn evaluate(&mut self, evaluator: &FitnessEvaluator) -> f64 {
        let score = evaluator.score(self);
        self.score = Some(score);
        score
    }

    /// Builder form of [`Surface::evaluate`].
    pub fn evaluated(mut self, evaluator: &FitnessEvaluator) -> Self {
        self.evaluate(evaluator);
        self
    }

    /// Convert to snapshot for serialization. Unscored surfaces keep `None`.
    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            heights: self.heights.clone(),
            radii: self.radii.clone(),
            score: self.score,
        }
    }
}

/// Sampler for freshly generated heights, checked once up front.
#[derive(Debug, Clone, Copy)]
pub enum HeightSampler {
    Uniform,
    Exponential(Exp<f64>),
}

impl HeightSampler {
    pub fn new(distribution: &HeightDistribution) -> Result<Self, ConfigError> {
        match *distribution {
            HeightDistribution::Uniform => Ok(Self::Uniform),
            HeightDistribution::Exponential { lambda } => {
                if !(lambda.is_finite() && lambda > 0.0) {
                    return Err(ConfigError::InvalidHeightDistribution(format!(
                        "exponential rate must be positive, got {lambda}"
                    )));
                }
                Exp::new(lambda)
                    .map(Self::Exponential)
                    .map_err(|e| ConfigError::InvalidHeightDistribution(e.to_string()))
            }
        }
    }
}

/// Random number generator wrapper for surface operators.
pub struct SurfaceRng {
    rng: StdRng,
}

impl SurfaceRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate next u64 for seeding task RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Generate a random surface within constraints.
    pub fn random_surface(
        &mut self,
        constraints: &SurfaceConstraints,
    ) -> Result<Surface, ConfigError> {
        let sampler = HeightSampler::new(&constraints.height_distribution)?;
        Ok(self.sample_surface(constraints, &sampler))
    }

    /// Generate a random surface with a prebuilt height sampler.
    pub fn sample_surface(
        &mut self,
        constraints: &SurfaceConstraints,
        sampler: &HeightSampler,
    ) -> Surface {
        let n = constraints.asperity_count;

        let heights: Vec<f64> = match *sampler {
            HeightSampler::Uniform => (0..n).map(|_| self.uniform_height(constraints)).collect(),
            HeightSampler::Exponential(exp) => {
                let (lo, hi) = constraints.height_bounds;
                (0..n)
                    .map(|_| {
                        let h: f64 = self.rng.sample(exp);
                        h.round().clamp(f64::from(lo), f64::from(hi))
                    })
                    .collect()
            }
        };

        let radii: Vec<f64> = match constraints.radius {
            RadiusMode::Fixed { radius } => vec![radius; n],
            RadiusMode::Variable { .. } => {
                (0..n).map(|_| self.uniform_radius(constraints)).collect()
            }
        };

        Surface {
            heights,
            radii,
            score: None,
        }
    }

    /// Uniform integer height over the bounds.
    fn uniform_height(&mut self, constraints: &SurfaceConstraints) -> f64 {
        let (lo, hi) = constraints.height_bounds;
        f64::from(self.rng.gen_range(lo..=hi))
    }

    /// Uniform radius over the allowed multiples of the step.
    fn uniform_radius(&mut self, constraints: &SurfaceConstraints) -> f64 {
        match constraints.radius_steps() {
            Some((lo, hi, step)) => f64::from(self.rng.gen_range(lo..=hi) * step),
            None => match constraints.radius {
                RadiusMode::Fixed { radius } => radius,
                RadiusMode::Variable { bounds, .. } => f64::from(bounds.0),
            },
        }
    }

    /// Build a child from two parents.
    ///
    /// Heights and (variable) radii are recombined independently, each with
    /// its own threshold or cut index.
    pub fn crossover(
        &mut self,
        first: &Surface,
        second: &Surface,
        method: CrossoverMethod,
        constraints: &SurfaceConstraints,
    ) -> Surface {
        let heights = self.crossover_genes(&first.heights, &second.heights, method);
        let radii = if constraints.radius.is_variable() {
            self.crossover_genes(&first.radii, &second.radii, method)
        } else {
            first.radii.clone()
        };

        Surface {
            heights,
            radii,
            score: None,
        }
    }

    fn crossover_genes(&mut self, a: &[f64], b: &[f64], method: CrossoverMethod) -> Vec<f64> {
        match method {
            CrossoverMethod::Threshold => {
                // Probability of taking the first parent's gene.
                let threshold = self.rng.r#gen::<f64>();
                a.iter()
                    .zip(b)
                    .map(|(&x, &y)| {
                        if self.rng.r#gen::<f64>() < threshold {
                            x
                        } else {
                            y
                        }
                    })
                    .collect()
            }
            CrossoverMethod::CutIndex => {
                let n = a.len().min(b.len());
                let cut = self.rng.gen_range(0..=n);
                a[..cut].iter().chain(&b[cut..n]).copied().collect()
            }
        }
    }

    /// Return a mutated copy of `surface` with its score cleared.
    ///
    /// Each height (and each radius in variable mode) is independently
    /// replaced with probability `rate`.
    pub fn mutate(
        &mut self,
        surface: Surface,
        rate: f64,
        policy: &MutationPolicy,
        constraints: &SurfaceConstraints,
    ) -> Surface {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        let Surface {
            mut heights,
            mut radii,
            ..
        } = surface;

        for h in &mut heights {
            if self.rng.gen_bool(rate) {
                *h = self.mutate_height(*h, policy, constraints);
            }
        }

        if constraints.radius.is_variable() {
            for r in &mut radii {
                if self.rng.gen_bool(rate) {
                    *r = self.mutate_radius(*r, policy, constraints);
                }
            }
        }

        Surface {
            heights,
            radii,
            score: None,
        }
    }

    fn mutate_height(
        &mut self,
        height: f64,
        policy: &MutationPolicy,
        constraints: &SurfaceConstraints,
    ) -> f64 {
        match *policy {
            MutationPolicy::Redraw => self.uniform_height(constraints),
            MutationPolicy::Perturb { amplitude } => {
                let (lo, hi) = constraints.height_bounds;
                let offset = self.offset(amplitude);
                (height.round() as i64 + offset).clamp(i64::from(lo), i64::from(hi)) as f64
            }
        }
    }

    fn mutate_radius(
        &mut self,
        radius: f64,
        policy: &MutationPolicy,
        constraints: &SurfaceConstraints,
    ) -> f64 {
        match *policy {
            MutationPolicy::Redraw => self.uniform_radius(constraints),
            MutationPolicy::Perturb { amplitude } => match constraints.radius_steps() {
                Some((lo, hi, step)) => {
                    let k = (radius / f64::from(step)).round() as i64 + self.offset(amplitude);
                    (k.clamp(i64::from(lo), i64::from(hi)) * i64::from(step)) as f64
                }
                None => radius,
            },
        }
    }

    fn offset(&mut self, amplitude: u32) -> i64 {
        let a = i64::from(amplitude);
        self.rng.gen_range(-a..=a)
    }
}
