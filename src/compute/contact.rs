//! Greenwood–Williamson elastic contact of a rough surface against a rigid flat.
//!
//! The surface is a population of independent spherical asperities. Each one
//! follows Hertzian contact once the reference plane has advanced past the gap
//! between its summit and the tallest summit:
//!
//! ```text
//! δ_i = max(depth + h_i - max(h), 0)
//! A_i = π R_i δ_i
//! F_i = (4/3) E* sqrt(π R_i) δ_i^(3/2)
//! ```

use crate::schema::{ContactConfig, DEFAULT_ELASTIC_MODULUS, TargetPoint};

/// Hertzian contact law aggregated over independent asperities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactModel {
    elastic_modulus: f64,
}

impl Default for ContactModel {
    fn default() -> Self {
        Self::new(DEFAULT_ELASTIC_MODULUS)
    }
}

impl ContactModel {
    /// Create a model from a composite modulus E*.
    pub fn new(elastic_modulus: f64) -> Self {
        Self { elastic_modulus }
    }

    /// Composite modulus of an elastic body against a rigid flat:
    /// E* = E / (1 - ν²).
    pub fn from_material(young_modulus: f64, poisson_ratio: f64) -> Self {
        Self::new(young_modulus / (1.0 - poisson_ratio * poisson_ratio))
    }

    pub fn from_config(config: &ContactConfig) -> Self {
        Self::new(config.elastic_modulus)
    }

    pub fn elastic_modulus(&self) -> f64 {
        self.elastic_modulus
    }

    /// Per-asperity areas and forces at a single indentation depth.
    pub fn indentation_response(
        &self,
        radii: &[f64],
        heights: &[f64],
        depth: f64,
    ) -> Result<IndentationResponse, ContactError> {
        check_lengths(radii, heights)?;

        let h_max = max_height(heights);
        let mut areas = Vec::with_capacity(heights.len());
        let mut forces = Vec::with_capacity(heights.len());

        for (&r, &h) in radii.iter().zip(heights) {
            let delta = local_indentation(depth, h, h_max);
            areas.push(area_term(r, delta));
            forces.push(self.force_term(r, delta));
        }

        let total_area = areas.iter().sum();
        let total_force = forces.iter().sum();

        Ok(IndentationResponse {
            areas,
            forces,
            total_area,
            total_force,
        })
    }

    /// Total area and force over `samples` evenly spaced depths from 0 to the
    /// tallest summit.
    ///
    /// Asperities are visited tallest first so each depth stops at the first
    /// disengaged summit; the summation order is fixed, which keeps the curve
    /// non-decreasing in depth and bit-reproducible.
    pub fn response_curve(
        &self,
        radii: &[f64],
        heights: &[f64],
        samples: usize,
    ) -> Result<ResponseCurve, ContactError> {
        check_lengths(radii, heights)?;

        let h_max = max_height(heights);
        let span = h_max.max(0.0);
        let depths: Vec<f64> = if samples > 1 {
            let last = (samples - 1) as f64;
            (0..samples).map(|k| span * k as f64 / last).collect()
        } else {
            vec![0.0; samples]
        };

        // Tallest first; ties keep input order.
        let mut order: Vec<usize> = (0..heights.len()).collect();
        order.sort_by(|&a, &b| heights[b].total_cmp(&heights[a]));

        let asperities: Vec<(f64, f64, f64)> = order
            .iter()
            .map(|&i| {
                let r = radii[i];
                (heights[i], std::f64::consts::PI * r, self.force_coefficient(r))
            })
            .collect();

        let mut areas = Vec::with_capacity(samples);
        let mut forces = Vec::with_capacity(samples);

        for &depth in &depths {
            let mut area = 0.0;
            let mut force = 0.0;
            for &(h, area_coeff, force_coeff) in &asperities {
                let delta = local_indentation(depth, h, h_max);
                if delta <= 0.0 {
                    break;
                }
                area += area_coeff * delta;
                force += force_coeff * delta * delta.sqrt();
            }
            areas.push(area);
            forces.push(force);
        }

        Ok(ResponseCurve {
            depths,
            areas,
            forces,
        })
    }

    /// (4/3) E* sqrt(π R).
    fn force_coefficient(&self, radius: f64) -> f64 {
        4.0 / 3.0 * self.elastic_modulus * (std::f64::consts::PI * radius).sqrt()
    }

    fn force_term(&self, radius: f64, delta: f64) -> f64 {
        self.force_coefficient(radius) * delta * delta.sqrt()
    }
}

#[inline]
fn local_indentation(depth: f64, height: f64, h_max: f64) -> f64 {
    (depth + height - h_max).max(0.0)
}

#[inline]
fn area_term(radius: f64, delta: f64) -> f64 {
    std::f64::consts::PI * radius * delta
}

fn max_height(heights: &[f64]) -> f64 {
    heights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn check_lengths(radii: &[f64], heights: &[f64]) -> Result<(), ContactError> {
    if radii.len() != heights.len() {
        return Err(ContactError::LengthMismatch {
            radii: radii.len(),
            heights: heights.len(),
        });
    }
    Ok(())
}

/// Contact state at one indentation depth.
#[derive(Debug, Clone, PartialEq)]
pub struct IndentationResponse {
    /// Contact area of each asperity, in input order.
    pub areas: Vec<f64>,
    /// Contact force of each asperity, in input order.
    pub forces: Vec<f64>,
    pub total_area: f64,
    pub total_force: f64,
}

/// A point on a force/area response curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub area: f64,
    pub force: f64,
}

/// Total area and force sampled over a depth grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCurve {
    pub depths: Vec<f64>,
    pub areas: Vec<f64>,
    pub forces: Vec<f64>,
}

impl ResponseCurve {
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// True when the curve never becomes positive on either axis.
    pub fn is_degenerate(&self) -> bool {
        !self.forces.iter().any(|&f| f > 0.0) || !self.areas.iter().any(|&a| a > 0.0)
    }

    /// See [`nearest_point`].
    pub fn nearest(&self, target: &TargetPoint) -> Option<CurvePoint> {
        nearest_point(&self.areas, &self.forces, target)
    }
}

/// Match a target against a sampled curve.
///
/// Returns the area at the sample whose force is closest to the target force,
/// and the force at the sample whose area is closest to the target area. The
/// two indices are chosen independently; ties go to the first index.
/// Returns `None` for an empty curve or mismatched lengths.
pub fn nearest_point(areas: &[f64], forces: &[f64], target: &TargetPoint) -> Option<CurvePoint> {
    if areas.len() != forces.len() {
        return None;
    }
    let by_force = nearest_index(forces, target.force)?;
    let by_area = nearest_index(areas, target.area)?;
    Some(CurvePoint {
        area: areas[by_force],
        force: forces[by_area],
    })
}

fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        let mut diff = (v - target).abs();
        if diff.is_nan() {
            diff = f64::INFINITY;
        }
        match best {
            Some((_, d)) if diff >= d => {}
            _ => best = Some((i, diff)),
        }
    }
    best.map(|(i, _)| i)
}

/// Response curve of a single candidate surface with the reference modulus.
pub fn simulate(
    radii: &[f64],
    heights: &[f64],
    samples: usize,
) -> Result<ResponseCurve, ContactError> {
    ContactModel::default().response_curve(radii, heights, samples)
}

/// Contact model input errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    #[error("Radius array has {radii} entries but height array has {heights}")]
    LengthMismatch { radii: usize, heights: usize },
}
