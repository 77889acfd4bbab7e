//! Metric distance engine.
//!
//! A measurement runs an ordered chain of [`DistanceStrategy`] values. The
//! first strategy that applies decides the outcome, including failure: a
//! degenerate homography projection does not fall back to the reference
//! scale. Requests with non-finite coordinates are rejected before any
//! strategy runs, and a non-finite distance is never returned.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::calibration::{pixel_distance, PlanarCalibration, ReferenceCalibration};
use crate::homography::DegenerateProjection;

/// The two image points whose distance is requested.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRequest {
    pub point_one: Point2<f64>,
    pub point_two: Point2<f64>,
}

impl MeasurementRequest {
    pub fn new(point_one: Point2<f64>, point_two: Point2<f64>) -> Self {
        Self {
            point_one,
            point_two,
        }
    }
}

/// Which calibration produced a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMethod {
    Homography,
    ReferenceScale,
}

/// A metric distance, unrounded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub meters: f64,
    pub method: MeasurementMethod,
}

/// Why no distance could be produced.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum MeasurementUnavailable {
    #[error("no calibration available")]
    NoCalibration,
    #[error("request point ({x}, {y}) is not finite")]
    InvalidPoint { x: f64, y: f64 },
    #[error("computed distance is not finite")]
    NonFiniteDistance,
    #[error(transparent)]
    DegenerateProjection(#[from] DegenerateProjection),
}

/// One way of turning a pair of image points into meters.
pub trait DistanceStrategy {
    fn method(&self) -> MeasurementMethod;

    /// `None` when this strategy cannot be used, so the next one is tried.
    fn distance(&self, request: &MeasurementRequest)
        -> Option<Result<f64, MeasurementUnavailable>>;
}

impl DistanceStrategy for PlanarCalibration {
    fn method(&self) -> MeasurementMethod {
        MeasurementMethod::Homography
    }

    fn distance(
        &self,
        request: &MeasurementRequest,
    ) -> Option<Result<f64, MeasurementUnavailable>> {
        Some(world_distance(self, request).map_err(Into::into))
    }
}

fn world_distance(
    planar: &PlanarCalibration,
    request: &MeasurementRequest,
) -> Result<f64, DegenerateProjection> {
    let a = planar.to_world(request.point_one)?;
    let b = planar.to_world(request.point_two)?;
    Ok(pixel_distance(a, b))
}

impl DistanceStrategy for ReferenceCalibration {
    fn method(&self) -> MeasurementMethod {
        MeasurementMethod::ReferenceScale
    }

    fn distance(
        &self,
        request: &MeasurementRequest,
    ) -> Option<Result<f64, MeasurementUnavailable>> {
        let mpp = self.meters_per_pixel()?;
        Some(Ok(pixel_distance(request.point_one, request.point_two) * mpp))
    }
}

/// Run `strategies` in order; the first applicable one decides.
pub fn measure_with<'a, I>(
    request: &MeasurementRequest,
    strategies: I,
) -> Result<Measurement, MeasurementUnavailable>
where
    I: IntoIterator<Item = &'a dyn DistanceStrategy>,
{
    for p in [request.point_one, request.point_two] {
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Err(MeasurementUnavailable::InvalidPoint { x: p.x, y: p.y });
        }
    }
    for strategy in strategies {
        if let Some(outcome) = strategy.distance(request) {
            let meters = outcome?;
            if !meters.is_finite() {
                return Err(MeasurementUnavailable::NonFiniteDistance);
            }
            return Ok(Measurement {
                meters,
                method: strategy.method(),
            });
        }
    }
    Err(MeasurementUnavailable::NoCalibration)
}

/// Measure with the fixed precedence: homography, then reference scale.
pub fn measure(
    request: &MeasurementRequest,
    planar: Option<&PlanarCalibration>,
    reference: Option<&ReferenceCalibration>,
) -> Result<Measurement, MeasurementUnavailable> {
    let chain: [Option<&dyn DistanceStrategy>; 2] = [
        planar.map(|p| p as &dyn DistanceStrategy),
        reference.map(|r| r as &dyn DistanceStrategy),
    ];
    measure_with(request, chain.into_iter().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homography::Homography;

    fn request(a: (f64, f64), b: (f64, f64)) -> MeasurementRequest {
        MeasurementRequest::new(Point2::new(a.0, a.1), Point2::new(b.0, b.1))
    }

    fn reference_2m_per_100px() -> ReferenceCalibration {
        ReferenceCalibration::new(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), 2.0)
    }

    fn scale_homography(s: f64) -> PlanarCalibration {
        PlanarCalibration::new(Homography::from_array([
            [s, 0.0, 0.0],
            [0.0, s, 0.0],
            [0.0, 0.0, 1.0],
        ]))
    }

    #[test]
    fn reference_scale_example() {
        let reference = reference_2m_per_100px();
        let m = measure(&request((0.0, 0.0), (50.0, 0.0)), None, Some(&reference))
            .expect("measurable");
        assert!((m.meters - 1.0).abs() < 1e-12);
        assert_eq!(m.method, MeasurementMethod::ReferenceScale);
    }

    #[test]
    fn homography_takes_precedence_over_reference() {
        let planar = scale_homography(0.01);
        let reference = reference_2m_per_100px();
        let req = request((0.0, 0.0), (50.0, 0.0));

        let m = measure(&req, Some(&planar), Some(&reference)).expect("measurable");
        assert_eq!(m.method, MeasurementMethod::Homography);
        assert!((m.meters - 0.5).abs() < 1e-12);

        let by_reference = measure(&req, None, Some(&reference)).expect("measurable");
        assert!((by_reference.meters - m.meters).abs() > 0.1);
    }

    #[test]
    fn homography_distance_uses_projective_mapping() {
        let planar = PlanarCalibration::new(Homography::from_array([
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.001, 0.0, 1.0],
        ]));
        // (1000, 0) -> (500, 0); origin stays fixed.
        let m = measure(&request((0.0, 0.0), (1000.0, 0.0)), Some(&planar), None)
            .expect("measurable");
        assert!((m.meters - 500.0).abs() < 1e-9);
    }

    #[test]
    fn no_calibration_is_unavailable() {
        let req = request((3.0, 4.0), (10.0, -2.0));
        assert_eq!(
            measure(&req, None, None),
            Err(MeasurementUnavailable::NoCalibration)
        );
    }

    #[test]
    fn zero_reference_length_is_treated_as_absent() {
        let reference =
            ReferenceCalibration::new(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), 0.0);
        assert_eq!(
            measure(&request((0.0, 0.0), (50.0, 0.0)), None, Some(&reference)),
            Err(MeasurementUnavailable::NoCalibration)
        );
    }

    #[test]
    fn degenerate_projection_does_not_fall_back() {
        let planar = PlanarCalibration::new(Homography::from_array([
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-0.5, 0.0, 1.0],
        ]));
        let reference = reference_2m_per_100px();
        let result = measure(
            &request((0.0, 0.0), (2.0, 5.0)),
            Some(&planar),
            Some(&reference),
        );
        assert!(matches!(
            result,
            Err(MeasurementUnavailable::DegenerateProjection(_))
        ));
    }

    #[test]
    fn custom_chain_order_is_respected() {
        let planar = scale_homography(0.01);
        let reference = reference_2m_per_100px();
        let req = request((0.0, 0.0), (50.0, 0.0));
        let chain: [&dyn DistanceStrategy; 2] = [&reference, &planar];
        let m = measure_with(&req, chain).expect("measurable");
        assert_eq!(m.method, MeasurementMethod::ReferenceScale);
    }

    #[test]
    fn non_finite_request_is_rejected_on_every_path() {
        let reference = reference_2m_per_100px();
        let identity = PlanarCalibration::new(Homography::identity());
        let req = request((f64::NAN, 0.0), (50.0, 0.0));

        let by_reference = measure(&req, None, Some(&reference));
        assert!(matches!(
            by_reference,
            Err(MeasurementUnavailable::InvalidPoint { .. })
        ));
        let by_homography = measure(&req, Some(&identity), Some(&reference));
        assert!(matches!(
            by_homography,
            Err(MeasurementUnavailable::InvalidPoint { .. })
        ));
        let uncalibrated = measure(&request((0.0, 0.0), (f64::INFINITY, 1.0)), None, None);
        assert!(matches!(
            uncalibrated,
            Err(MeasurementUnavailable::InvalidPoint { .. })
        ));
    }

    #[test]
    fn overflowing_distance_is_rejected() {
        let reference =
            ReferenceCalibration::new(Point2::new(0.0, 0.0), Point2::new(1e-300, 0.0), 1e300);
        assert_eq!(
            measure(&request((0.0, 0.0), (1e10, 0.0)), None, Some(&reference)),
            Err(MeasurementUnavailable::NonFiniteDistance)
        );
    }

    #[test]
    fn zero_length_request_measures_zero() {
        let reference = reference_2m_per_100px();
        let m = measure(&request((7.0, 7.0), (7.0, 7.0)), None, Some(&reference))
            .expect("measurable");
        assert_eq!(m.meters, 0.0);
    }
}
