//! Presentation helpers. All arithmetic upstream stays in meters.

use std::fmt;

use planar_measure_core::{Measurement, MeasurementUnavailable};
use serde::{Deserialize, Serialize};

pub const METERS_TO_FEET: f64 = 3.28084;

/// Shown in place of a distance that cannot be computed.
pub const UNAVAILABLE: &str = "—";

#[inline]
pub fn meters_to_feet(meters: f64) -> f64 {
    meters * METERS_TO_FEET
}

/// `"1.00 m (3.28 ft)"`.
pub fn format_distance(meters: f64) -> String {
    format!("{:.2} m ({:.2} ft)", meters, meters_to_feet(meters))
}

pub fn format_result<E>(result: &Result<Measurement, E>) -> String {
    match result {
        Ok(m) => format_distance(m.meters),
        Err(_) => UNAVAILABLE.to_string(),
    }
}

/// Human-readable reason for an unavailable measurement.
pub fn describe_unavailable(err: &MeasurementUnavailable) -> String {
    match err {
        MeasurementUnavailable::NoCalibration => {
            "unable to compute distance: set a reference or perform calibration".to_string()
        }
        MeasurementUnavailable::InvalidPoint { x, y } => {
            format!("unable to compute distance: point ({x}, {y}) is not a finite position")
        }
        MeasurementUnavailable::NonFiniteDistance => {
            "unable to compute distance: the result is out of range".to_string()
        }
        MeasurementUnavailable::DegenerateProjection(p) => format!(
            "unable to compute distance: point ({:.1}, {:.1}) lies on the calibration horizon",
            p.x, p.y
        ),
    }
}

/// Whether a planar calibration is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Calibrated,
    Uncalibrated,
}

impl CalibrationStatus {
    pub fn from_calibrated(calibrated: bool) -> Self {
        if calibrated {
            Self::Calibrated
        } else {
            Self::Uncalibrated
        }
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calibrated => f.write_str("Calibrated"),
            Self::Uncalibrated => f.write_str("Uncalibrated"),
        }
    }
}
