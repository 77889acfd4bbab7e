use serde::{Deserialize, Serialize};

/// Smallest admissible pivot magnitude in the linear solver.
pub const DEFAULT_PIVOT_THRESHOLD: f64 = 1e-12;

/// Smallest admissible `|w|` in the projective divide.
pub const DEFAULT_PROJECTION_EPSILON: f64 = 1e-12;

/// Numerical tolerances for calibration and measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureParams {
    /// Gaussian elimination fails when no candidate pivot reaches this value.
    pub pivot_threshold: f64,
    /// Mapping a point through a homography fails when `|w|` is at or below this.
    pub projection_epsilon: f64,
}

impl Default for MeasureParams {
    fn default() -> Self {
        Self {
            pivot_threshold: DEFAULT_PIVOT_THRESHOLD,
            projection_epsilon: DEFAULT_PROJECTION_EPSILON,
        }
    }
}
