//! Scoring of candidate surfaces against target checkpoints.
//!
//! Each checkpoint contributes a squared relative error on both axes, where
//! both axes are normalized by the anchor (last) checkpoint:
//!
//! ```text
//! e_j = ((f_j - F_j) / F_anchor)^2 + ((a_j - A_j) / A_anchor)^2
//! ```
//!
//! `a_j` is the curve area where the force is closest to `F_j`, and `f_j` the
//! curve force where the area is closest to `A_j`.

use crate::compute::{ContactModel, ResponseCurve};
use crate::schema::{EvolutionConfig, ScoringConfig, TargetSet};

use super::surface::Surface;

/// Score assigned to surfaces whose response cannot be compared to the
/// targets (degenerate curve, mismatched genes, non-finite error).
pub const WORST_SCORE: f64 = f64::MAX;

/// Scores surfaces against a fixed target set.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    model: ContactModel,
    samples: usize,
    targets: TargetSet,
    weighted: bool,
}

impl FitnessEvaluator {
    /// Create a new fitness evaluator.
    pub fn new(
        model: ContactModel,
        samples: usize,
        targets: TargetSet,
        scoring: &ScoringConfig,
    ) -> Self {
        Self {
            model,
            samples,
            targets,
            weighted: scoring.weighted,
        }
    }

    pub fn from_config(config: &EvolutionConfig, targets: TargetSet) -> Self {
        Self::new(
            ContactModel::from_config(&config.contact),
            config.contact.samples,
            targets,
            &config.scoring,
        )
    }

    pub fn model(&self) -> &ContactModel {
        &self.model
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    /// Score a surface without caching. Lower is better.
    pub fn score(&self, surface: &Surface) -> f64 {
        match surface.response_curve(&self.model, self.samples) {
            Ok(curve) => score_curve(&curve, &self.targets, self.weighted),
            Err(_) => WORST_SCORE,
        }
    }
}

/// Score a precomputed response curve.
///
/// Weighted: the first checkpoint's term enters with weight 1 and the
/// remaining terms are accumulated onto it. Unweighted: mean of the terms.
pub fn score_curve(curve: &ResponseCurve, targets: &TargetSet, weighted: bool) -> f64 {
    if curve.is_degenerate() {
        return WORST_SCORE;
    }

    let anchor = targets.anchor();
    let mut total = 0.0;
    for target in targets.points() {
        let Some(point) = curve.nearest(target) else {
            return WORST_SCORE;
        };
        let force_err = (point.force - target.force) / anchor.force;
        let area_err = (point.area - target.area) / anchor.area;
        total += force_err * force_err + area_err * area_err;
    }

    let score = if weighted {
        total
    } else {
        total / targets.len() as f64
    };

    if score.is_finite() { score } else { WORST_SCORE }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TargetPoint;

    fn reference_surface() -> Surface {
        let heights: Vec<f64> = (0..32).map(|i| f64::from((i * 37) % 121)).collect();
        Surface::with_fixed_radius(heights, 526.0)
    }

    fn evaluator(targets: Vec<TargetPoint>, weighted: bool) -> FitnessEvaluator {
        FitnessEvaluator::new(
            ContactModel::default(),
            2_000,
            TargetSet::new(targets).unwrap(),
            &ScoringConfig { weighted },
        )
    }

    fn curve_extent(surface: &Surface) -> (f64, f64) {
        let curve = surface.response_curve(&ContactModel::default(), 2_000).unwrap();
        (curve.forces[curve.len() - 1], curve.areas[curve.len() - 1])
    }

    #[test]
    fn test_exact_curve_point_scores_zero() {
        let surface = reference_surface();
        let (f, a) = curve_extent(&surface);
        let eval = evaluator(vec![TargetPoint::new(f, a)], true);
        assert_eq!(eval.score(&surface), 0.0);
    }

    #[test]
    fn test_evaluate_caches_score() {
        let mut surface = reference_surface();
        let (f, a) = curve_extent(&surface);
        let eval = evaluator(vec![TargetPoint::new(0.5 * f, 0.7 * a)], true);

        assert!(surface.score().is_none());
        let score = surface.evaluate(&eval);
        assert!(score > 0.0);
        assert_eq!(surface.score(), Some(score));
    }

    #[test]
    fn test_reordering_non_anchor_points() {
        let surface = reference_surface();
        let (f, a) = curve_extent(&surface);
        let p1 = TargetPoint::new(0.1 * f, 0.2 * a);
        let p2 = TargetPoint::new(0.3 * f, 0.25 * a);
        let p3 = TargetPoint::new(0.55 * f, 0.4 * a);
        let anchor = TargetPoint::new(0.8 * f, 0.9 * a);

        for weighted in [true, false] {
            let s1 = evaluator(vec![p1, p2, p3, anchor], weighted).score(&surface);
            let s2 = evaluator(vec![p3, p1, p2, anchor], weighted).score(&surface);
            assert!((s1 - s2).abs() <= 1e-12 * s1.abs().max(1.0));
        }
    }

    #[test]
    fn test_anchor_changes_normalization() {
        let surface = reference_surface();
        let (f, a) = curve_extent(&surface);
        let p1 = TargetPoint::new(0.1 * f, 0.2 * a);
        let p2 = TargetPoint::new(0.3 * f, 0.25 * a);

        let s1 = evaluator(vec![p1, p2, TargetPoint::new(0.8 * f, 0.9 * a)], true).score(&surface);
        let s2 = evaluator(vec![p1, p2, TargetPoint::new(2.0 * f, 3.0 * a)], true).score(&surface);
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_unweighted_is_mean() {
        let surface = reference_surface();
        let (f, a) = curve_extent(&surface);
        let points = vec![
            TargetPoint::new(0.2 * f, 0.1 * a),
            TargetPoint::new(0.4 * f, 0.6 * a),
            TargetPoint::new(0.9 * f, 0.8 * a),
        ];

        let summed = evaluator(points.clone(), true).score(&surface);
        let mean = evaluator(points, false).score(&surface);
        assert!((summed / 3.0 - mean).abs() <= 1e-12 * summed);
    }

    #[test]
    fn test_degenerate_surface_scores_worst() {
        let flat = Surface::with_fixed_radius(vec![0.0; 16], 526.0);
        let eval = evaluator(vec![TargetPoint::new(1.0e9, 1.0e5)], true);
        assert_eq!(eval.score(&flat), WORST_SCORE);
    }
}
