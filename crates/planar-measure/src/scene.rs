//! JSON scene files: a recorded set of taps replayed through a session.
//!
//! ```json
//! {
//!   "reference": { "point_a": [0, 0], "point_b": [100, 0], "real_distance": 2.0 },
//!   "rectangle": { "corners": [[0, 0], [100, 0], [100, 50], [0, 50]], "width": 2.0, "height": 1.0 },
//!   "points": [[0, 0], [50, 0]]
//! }
//! ```
//!
//! `params`, `reference` and `rectangle` are optional.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use planar_measure_core::{MeasureParams, Measurement, RectangleSize, ReferenceCalibration};

use crate::format::{describe_unavailable, format_result, CalibrationStatus};
use crate::session::{MeasureSession, SessionError, TapMode};

#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    #[error("failed to read scene {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene rectangle needs exactly 4 corners (got {got})")]
    CornerCount { got: usize },
    #[error("scene has no calibration rectangle")]
    NoRectangle,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Four tapped corners of a rectangle of known size (meters).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectangleCapture {
    pub corners: Vec<Point2<f64>>,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub params: MeasureParams,
    #[serde(default)]
    pub reference: Option<ReferenceCalibration>,
    #[serde(default)]
    pub rectangle: Option<RectangleCapture>,
    /// The two points to measure between, in image pixels.
    pub points: [Point2<f64>; 2],
}

/// Outcome of replaying a scene.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneReport {
    pub status: CalibrationStatus,
    /// Row-major image-to-world homography, when calibrated.
    pub homography: Option<[[f64; 3]; 3]>,
    pub measurement: Option<Measurement>,
    /// Why `measurement` is missing.
    pub unavailable: Option<String>,
    pub display: String,
}

impl Scene {
    pub fn from_json_str(raw: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let raw = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Feed the recorded taps into a fresh session, applying the rectangle
    /// calibration when one is present.
    pub fn replay(&self) -> Result<MeasureSession, SceneError> {
        let mut session = MeasureSession::new(self.params);

        if let Some(reference) = &self.reference {
            session.set_mode(TapMode::Reference);
            session.tap(reference.point_a);
            session.tap(reference.point_b);
            session.set_reference_length(reference.real_distance);
        }

        if let Some(rect) = &self.rectangle {
            if rect.corners.len() != 4 {
                return Err(SceneError::CornerCount {
                    got: rect.corners.len(),
                });
            }
            session.set_mode(TapMode::Calibrate);
            for &corner in &rect.corners {
                session.tap(corner);
            }
            session.set_rectangle_size(RectangleSize::new(rect.width, rect.height));
            session.apply_calibration()?;
        }

        session.set_mode(TapMode::PointOne);
        session.tap(self.points[0]);
        session.set_mode(TapMode::PointTwo);
        session.tap(self.points[1]);
        session.set_mode(TapMode::Idle);

        Ok(session)
    }

    pub fn evaluate(&self) -> Result<SceneReport, SceneError> {
        let session = self.replay()?;
        Ok(SceneReport::from_session(&session))
    }

    /// Estimate only the rectangle homography.
    pub fn calibrate(&self) -> Result<[[f64; 3]; 3], SceneError> {
        if self.rectangle.is_none() {
            return Err(SceneError::NoRectangle);
        }
        let session = self.replay()?;
        session
            .slot()
            .current()
            .map(|c| c.homography.to_array())
            .ok_or(SceneError::NoRectangle)
    }
}

impl SceneReport {
    pub fn from_session(session: &MeasureSession) -> Self {
        let result = session.measure();
        let (measurement, unavailable) = match &result {
            Ok(m) => (Some(*m), None),
            Err(SessionError::Unavailable(u)) => (None, Some(describe_unavailable(u))),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            status: session.status(),
            homography: session
                .slot()
                .current()
                .map(|c| c.homography.to_array()),
            measurement,
            unavailable,
            display: format_result(&result),
        }
    }
}
