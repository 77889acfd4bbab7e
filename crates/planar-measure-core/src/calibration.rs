//! Calibration value objects.
//!
//! Two ways to turn pixels into meters:
//! - [`ReferenceCalibration`]: one segment of known length gives a single
//!   meters-per-pixel ratio (valid for fronto-parallel scenes only).
//! - [`PlanarCalibration`]: a homography from four image corners of a known
//!   rectangle onto the metric plane.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::homography::{
    estimate_homography_with_threshold, DegenerateProjection, Homography, HomographyError,
};
use crate::params::{MeasureParams, DEFAULT_PROJECTION_EPSILON};

/// Euclidean distance between two points of the same space.
#[inline]
pub fn pixel_distance(a: Point2<f64>, b: Point2<f64>) -> f64 {
    nalgebra::distance(&a, &b)
}

/// Real-world size of the calibration rectangle, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectangleSize {
    pub width: f64,
    pub height: f64,
}

impl RectangleSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both sides finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        is_positive_length(self.width) && is_positive_length(self.height)
    }

    /// World corners in tap order: top-left, top-right, bottom-right, bottom-left.
    pub fn world_corners(&self) -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(self.width, 0.0),
            Point2::new(self.width, self.height),
            Point2::new(0.0, self.height),
        ]
    }
}

/// Errors raised while building a [`PlanarCalibration`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    #[error("invalid calibration rectangle {width} x {height} m (both sides must be > 0)")]
    InvalidRectangle { width: f64, height: f64 },
    #[error(transparent)]
    Estimation(#[from] HomographyError),
}

/// Scale calibration from a single segment of known length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCalibration {
    pub point_a: Point2<f64>,
    pub point_b: Point2<f64>,
    /// Real length of `point_a -> point_b`, in meters.
    pub real_distance: f64,
}

impl ReferenceCalibration {
    pub fn new(point_a: Point2<f64>, point_b: Point2<f64>, real_distance: f64) -> Self {
        Self {
            point_a,
            point_b,
            real_distance,
        }
    }

    /// Meters per pixel, or `None` when the calibration must not be used
    /// (non-positive length, or coincident reference points).
    pub fn meters_per_pixel(&self) -> Option<f64> {
        if !is_positive_length(self.real_distance) {
            return None;
        }
        let px = pixel_distance(self.point_a, self.point_b);
        if !is_positive_length(px) {
            return None;
        }
        Some(self.real_distance / px)
    }

    pub fn is_valid(&self) -> bool {
        self.meters_per_pixel().is_some()
    }
}

/// Image-to-world homography (meters) with the tolerance used to apply it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanarCalibration {
    pub homography: Homography,
    pub projection_epsilon: f64,
}

impl PlanarCalibration {
    pub fn new(homography: Homography) -> Self {
        Self {
            homography,
            projection_epsilon: DEFAULT_PROJECTION_EPSILON,
        }
    }

    /// Estimate the calibration from the four tapped corners of a rectangle
    /// of known size. `corners[i]` must match `size.world_corners()[i]`.
    pub fn from_rectangle(
        corners: &[Point2<f64>],
        size: RectangleSize,
        params: &MeasureParams,
    ) -> Result<Self, CalibrationError> {
        if !size.is_valid() {
            return Err(CalibrationError::InvalidRectangle {
                width: size.width,
                height: size.height,
            });
        }
        let world = size.world_corners();
        let homography =
            estimate_homography_with_threshold(corners, &world, params.pivot_threshold)?;
        Ok(Self {
            homography,
            projection_epsilon: params.projection_epsilon,
        })
    }

    /// Map an image point onto the metric plane.
    pub fn to_world(&self, p: Point2<f64>) -> Result<Point2<f64>, DegenerateProjection> {
        let eps = self.projection_epsilon;
        self.homography.apply_with_epsilon(p, eps)
    }
}

/// `true` when the quad, taken in the given order, is strictly convex.
///
/// A self-intersecting ("bow-tie") result usually means the corners were not
/// tapped in perimeter order.
pub fn is_convex_quad(pts: &[Point2<f64>; 4]) -> bool {
    let mut sign = 0.0_f64;
    for i in 0..4 {
        let a = pts[i];
        let b = pts[(i + 1) % 4];
        let c = pts[(i + 2) % 4];
        let cross = (b - a).perp(&(c - b));
        if cross == 0.0 || cross.is_nan() {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

fn is_positive_length(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
