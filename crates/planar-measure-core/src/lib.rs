//! Geometric calibration and metric distance engine for tap-to-measure tools.
//!
//! Points tapped on a camera frame are turned into real-world distances in
//! one of two ways:
//! - a reference segment of known length gives a meters-per-pixel scale;
//! - four tapped corners of a rectangle of known size give a homography from
//!   the image onto the metric plane.
//!
//! The homography, when present, always wins. Everything here is synchronous
//! and allocation-light; the only shared mutable state is the
//! [`CalibrationSlot`].
//!
//! ```
//! use nalgebra::Point2;
//! use planar_measure_core::{measure, MeasurementRequest, ReferenceCalibration};
//!
//! let reference = ReferenceCalibration::new(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), 2.0);
//! let request = MeasurementRequest::new(Point2::new(0.0, 0.0), Point2::new(50.0, 0.0));
//! let m = measure(&request, None, Some(&reference)).unwrap();
//! assert!((m.meters - 1.0).abs() < 1e-12);
//! ```

mod calibration;
mod distance;
mod homography;
mod linear;
mod logger;
mod params;
mod slot;

/// A point in image pixels or world meters, depending on the stage.
pub type Point2D = nalgebra::Point2<f64>;

pub use calibration::{
    is_convex_quad, pixel_distance, CalibrationError, PlanarCalibration, RectangleSize,
    ReferenceCalibration,
};
pub use distance::{
    measure, measure_with, DistanceStrategy, Measurement, MeasurementMethod, MeasurementRequest,
    MeasurementUnavailable,
};
pub use homography::{
    estimate_homography, estimate_homography_with_threshold, DegenerateProjection, Homography,
    HomographyError, PointSide,
};
pub use linear::{solve_linear_system, solve_linear_system_with_threshold, LinearSolveError};
pub use params::{MeasureParams, DEFAULT_PIVOT_THRESHOLD, DEFAULT_PROJECTION_EPSILON};
pub use slot::CalibrationSlot;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{filter_directive, init_with_level, level_from_name};
