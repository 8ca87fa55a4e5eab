//! Summary statistics and JSON export for a finished search.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compute::{ContactError, ContactModel};
use crate::schema::{EvolutionResult, SurfaceSnapshot, TargetPoint, TargetSet};

/// Moments of a height distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightStatistics {
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub skewness: f64,
    /// Excess kurtosis (0 for a normal distribution).
    pub kurtosis: f64,
}

impl HeightStatistics {
    /// `None` for an empty height array. Skewness and kurtosis are 0 when
    /// every height is equal.
    pub fn from_heights(heights: &[f64]) -> Option<Self> {
        if heights.is_empty() {
            return None;
        }

        let n = heights.len() as f64;
        let mean = heights.iter().sum::<f64>() / n;

        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for &h in heights {
            let d = h - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        m2 /= n;
        m3 /= n;
        m4 /= n;

        let (skewness, kurtosis) = if m2 > 0.0 {
            (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
        } else {
            (0.0, 0.0)
        };

        Some(Self {
            mean,
            variance: m2,
            skewness,
            kurtosis,
        })
    }
}

/// Sampled force/area curve in export form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveExport {
    pub areas: Vec<f64>,
    pub forces: Vec<f64>,
}

/// Everything a plotting or storage sink needs about a finished search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReport {
    pub surface: SurfaceSnapshot,
    pub statistics: Option<HeightStatistics>,
    pub targets: Vec<TargetPoint>,
    pub curve: CurveExport,
    pub score_trajectory: Vec<f64>,
}

impl SurfaceReport {
    /// Build a report for the best surface of `result`.
    pub fn new(
        result: &EvolutionResult,
        targets: &TargetSet,
        model: &ContactModel,
        samples: usize,
    ) -> Result<Self, ContactError> {
        let best = &result.best;
        let curve = model.response_curve(&best.radii, &best.heights, samples)?;

        Ok(Self {
            surface: best.clone(),
            statistics: HeightStatistics::from_heights(&best.heights),
            targets: targets.points().to_vec(),
            curve: CurveExport {
                areas: curve.areas,
                forces: curve.forces,
            },
            score_trajectory: result.history.best_score.clone(),
        })
    }

    /// Write the report as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
