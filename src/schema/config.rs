//! Configuration types for the contact model and the surface genome.

use serde::{Deserialize, Serialize};

/// Composite elastic modulus E* used by the reference runs.
pub const DEFAULT_ELASTIC_MODULUS: f64 = 1.36e6;

/// Radius of curvature (µm) used when radii are held fixed.
pub const DEFAULT_RADIUS: f64 = 526.0;

fn default_elastic_modulus() -> f64 {
    DEFAULT_ELASTIC_MODULUS
}
fn default_samples() -> usize {
    10_000
}

/// Forward contact-model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Composite elastic modulus E*.
    #[serde(default = "default_elastic_modulus")]
    pub elastic_modulus: f64,
    /// Number of depth samples in a response curve.
    #[serde(default = "default_samples")]
    pub samples: usize,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            elastic_modulus: default_elastic_modulus(),
            samples: default_samples(),
        }
    }
}

impl ContactConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.elastic_modulus.is_finite() && self.elastic_modulus > 0.0) {
            return Err(ConfigError::InvalidElasticModulus(self.elastic_modulus));
        }
        if self.samples == 0 {
            return Err(ConfigError::InvalidSamples);
        }
        Ok(())
    }
}

/// How curvature radii are handled across the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RadiusMode {
    /// Every asperity shares one radius; radii are not part of the genome.
    Fixed { radius: f64 },
    /// Each asperity carries its own radius, drawn from multiples of `step`
    /// within `bounds` (inclusive).
    Variable { bounds: (u32, u32), step: u32 },
}

impl Default for RadiusMode {
    fn default() -> Self {
        Self::Fixed {
            radius: DEFAULT_RADIUS,
        }
    }
}

impl RadiusMode {
    /// Whether radii form a second genome segment.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }

    /// Reference variable-radius range: 100..=530 µm in steps of 10.
    pub fn variable_reference() -> Self {
        Self::Variable {
            bounds: (100, 530),
            step: 10,
        }
    }
}

/// Distribution used for freshly generated heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum HeightDistribution {
    /// Uniform integers over the height bounds.
    #[default]
    Uniform,
    /// Exponential with rate `lambda`, rounded to 1 µm and clamped to the
    /// height bounds.
    Exponential { lambda: f64 },
}

fn default_asperity_count() -> usize {
    64
}
fn default_height_bounds() -> (u32, u32) {
    (0, 120)
}

/// Shape of the genome: asperity count and gene ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConstraints {
    /// Number of asperities per surface.
    #[serde(default = "default_asperity_count")]
    pub asperity_count: usize,
    /// Inclusive height range in µm (1 µm resolution).
    #[serde(default = "default_height_bounds")]
    pub height_bounds: (u32, u32),
    /// Distribution for random heights.
    #[serde(default)]
    pub height_distribution: HeightDistribution,
    /// Fixed or per-asperity radii.
    #[serde(default)]
    pub radius: RadiusMode,
}

impl Default for SurfaceConstraints {
    fn default() -> Self {
        Self {
            asperity_count: default_asperity_count(),
            height_bounds: default_height_bounds(),
            height_distribution: HeightDistribution::default(),
            radius: RadiusMode::default(),
        }
    }
}

impl SurfaceConstraints {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.asperity_count == 0 {
            return Err(ConfigError::InvalidAsperityCount);
        }

        let (lo, hi) = self.height_bounds;
        if lo > hi {
            return Err(ConfigError::InvalidBounds(format!(
                "height min ({lo}) > max ({hi})"
            )));
        }

        if let HeightDistribution::Exponential { lambda } = self.height_distribution
            && !(lambda.is_finite() && lambda > 0.0)
        {
            return Err(ConfigError::InvalidHeightDistribution(format!(
                "exponential rate must be positive, got {lambda}"
            )));
        }

        match self.radius {
            RadiusMode::Fixed { radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(ConfigError::InvalidRadius(format!(
                        "fixed radius must be positive, got {radius}"
                    )));
                }
            }
            RadiusMode::Variable { bounds, step } => {
                if step == 0 {
                    return Err(ConfigError::InvalidRadius("step must be non-zero".into()));
                }
                if bounds.0 > bounds.1 {
                    return Err(ConfigError::InvalidBounds(format!(
                        "radius min ({}) > max ({})",
                        bounds.0, bounds.1
                    )));
                }
                // At least one positive multiple of step must fit in bounds.
                let first = bounds.0.div_ceil(step).max(1) * step;
                if first > bounds.1 {
                    return Err(ConfigError::InvalidRadius(format!(
                        "no positive multiple of {step} in [{}, {}]",
                        bounds.0, bounds.1
                    )));
                }
            }
        }

        Ok(())
    }

    /// Inclusive range of radius multipliers `k` such that `k * step` lies in
    /// bounds. Only meaningful in variable mode.
    pub fn radius_steps(&self) -> Option<(u32, u32, u32)> {
        match self.radius {
            RadiusMode::Variable { bounds, step } if step > 0 => {
                let lo = bounds.0.div_ceil(step).max(1);
                let hi = bounds.1 / step;
                Some((lo, hi, step))
            }
            _ => None,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Asperity count must be non-zero")]
    InvalidAsperityCount,
    #[error("Response curve sample count must be non-zero")]
    InvalidSamples,
    #[error("Elastic modulus must be positive and finite, got {0}")]
    InvalidElasticModulus(f64),
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Invalid radius: {0}")]
    InvalidRadius(String),
    #[error("Invalid height distribution: {0}")]
    InvalidHeightDistribution(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(ContactConfig::default().validate().is_ok());
        assert!(SurfaceConstraints::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_height_bounds() {
        let constraints = SurfaceConstraints {
            height_bounds: (50, 10),
            ..Default::default()
        };
        assert!(matches!(
            constraints.validate(),
            Err(ConfigError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_radius_steps() {
        let constraints = SurfaceConstraints {
            radius: RadiusMode::variable_reference(),
            ..Default::default()
        };
        assert!(constraints.validate().is_ok());
        assert_eq!(constraints.radius_steps(), Some((10, 53, 10)));
    }

    #[test]
    fn test_variable_radius_without_multiple() {
        let constraints = SurfaceConstraints {
            radius: RadiusMode::Variable {
                bounds: (101, 109),
                step: 10,
            },
            ..Default::default()
        };
        assert!(matches!(
            constraints.validate(),
            Err(ConfigError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_tagged_serialization() {
        let json = r#"{"asperity_count": 8, "radius": {"type": "Variable", "bounds": [100, 530], "step": 10}}"#;
        let parsed: SurfaceConstraints = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.asperity_count, 8);
        assert_eq!(parsed.height_bounds, (0, 120));
        assert!(parsed.radius.is_variable());
    }
}
