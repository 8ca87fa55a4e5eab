//! Target checkpoints for the inverse problem.
//!
//! A target set is an ordered list of (force, contact-area) pairs. The last
//! point is the normalization anchor: its force and area scale every
//! squared-error term so checkpoints at different orders of magnitude
//! contribute comparably.

use serde::{Deserialize, Serialize};

/// A single (force, contact-area) checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPoint {
    /// Normal force.
    pub force: f64,
    /// Real contact area.
    pub area: f64,
}

impl TargetPoint {
    pub fn new(force: f64, area: f64) -> Self {
        Self { force, area }
    }
}

impl From<(f64, f64)> for TargetPoint {
    fn from((force, area): (f64, f64)) -> Self {
        Self { force, area }
    }
}

/// Validated, non-empty target set with a usable anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TargetSet {
    points: Vec<TargetPoint>,
}

impl TargetSet {
    /// Validate and wrap a list of checkpoints.
    ///
    /// The anchor (last point) must have strictly positive force and area and
    /// must dominate every other checkpoint on both axes.
    pub fn new(points: Vec<TargetPoint>) -> Result<Self, TargetError> {
        let Some(anchor) = points.last().copied() else {
            return Err(TargetError::Empty);
        };

        for (index, p) in points.iter().enumerate() {
            if !p.force.is_finite() || !p.area.is_finite() {
                return Err(TargetError::NonFinite { index });
            }
            if p.force < 0.0 || p.area < 0.0 {
                return Err(TargetError::Negative { index });
            }
        }

        if anchor.force <= 0.0 || anchor.area <= 0.0 {
            return Err(TargetError::ZeroAnchor {
                force: anchor.force,
                area: anchor.area,
            });
        }

        if let Some(index) = points
            .iter()
            .position(|p| p.force > anchor.force || p.area > anchor.area)
        {
            return Err(TargetError::NonMonotonicAnchor { index });
        }

        Ok(Self { points })
    }

    /// All checkpoints, anchor last.
    pub fn points(&self) -> &[TargetPoint] {
        &self.points
    }

    /// The normalization anchor.
    pub fn anchor(&self) -> TargetPoint {
        // Non-empty by construction.
        self.points[self.points.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<TargetPoint>> for TargetSet {
    type Error = TargetError;

    fn try_from(points: Vec<TargetPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl<'de> Deserialize<'de> for TargetSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let points = Vec::<TargetPoint>::deserialize(deserializer)?;
        TargetSet::new(points).map_err(serde::de::Error::custom)
    }
}

/// Target set validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TargetError {
    #[error("Target set is empty")]
    Empty,
    #[error("Target point {index} has a non-finite value")]
    NonFinite { index: usize },
    #[error("Target point {index} has a negative value")]
    Negative { index: usize },
    #[error("Anchor point must have positive force and area (got force={force}, area={area})")]
    ZeroAnchor { force: f64, area: f64 },
    #[error("Target point {index} exceeds the anchor point; the anchor must be the largest checkpoint")]
    NonMonotonicAnchor { index: usize },
}
