//! Point-collection state of a measuring screen.
//!
//! The host UI forwards taps together with the current [`TapMode`]; the
//! session keeps the two measured points, the reference segment, the
//! calibration corners and the active planar calibration.

use log::{debug, info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use planar_measure_core::{
    is_convex_quad, CalibrationError, CalibrationSlot, MeasureParams, Measurement,
    MeasurementRequest, MeasurementUnavailable, PlanarCalibration, RectangleSize,
    ReferenceCalibration,
};

use crate::format::{format_result, CalibrationStatus};

const CORNER_COUNT: usize = 4;

/// What the next tap sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapMode {
    /// First measured point (the "tee").
    #[default]
    PointOne,
    /// Second measured point (the "jack"); measures immediately.
    PointTwo,
    /// Reference segment endpoints.
    Reference,
    /// Rectangle corners: top-left, top-right, bottom-right, bottom-left.
    Calibrate,
    Idle,
}

/// Result of a single tap.
#[derive(Clone, Debug, PartialEq)]
pub enum TapOutcome {
    Ignored,
    PointOne,
    /// `measurement` is `None` while the first point is still missing.
    PointTwo {
        measurement: Option<Result<Measurement, MeasurementUnavailable>>,
    },
    /// `index` 0 is reference point A, 1 is point B.
    ReferencePoint { index: usize },
    Corner { collected: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("tap the 4 corners of the rectangle in order (have {got})")]
    NotEnoughCorners { got: usize },
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("both reference points and a positive reference length in meters are required")]
    ReferenceMissing,
    #[error("both measurement points must be set")]
    MissingPoints,
    #[error(transparent)]
    Unavailable(#[from] MeasurementUnavailable),
}

#[derive(Debug)]
pub struct MeasureSession {
    mode: TapMode,
    point_one: Option<Point2<f64>>,
    point_two: Option<Point2<f64>>,
    reference_a: Option<Point2<f64>>,
    reference_b: Option<Point2<f64>>,
    reference_length: f64,
    corners: Vec<Point2<f64>>,
    rectangle: RectangleSize,
    slot: CalibrationSlot,
}

impl Default for MeasureSession {
    fn default() -> Self {
        Self::new(MeasureParams::default())
    }
}

impl MeasureSession {
    pub fn new(params: MeasureParams) -> Self {
        Self {
            mode: TapMode::default(),
            point_one: None,
            point_two: None,
            reference_a: None,
            reference_b: None,
            reference_length: 1.0,
            corners: Vec::with_capacity(CORNER_COUNT),
            rectangle: RectangleSize::new(1.0, 0.1),
            slot: CalibrationSlot::new(params),
        }
    }

    pub fn mode(&self) -> TapMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TapMode) {
        self.mode = mode;
    }

    /// Record a tap at `p` (image pixels) according to the current mode.
    pub fn tap(&mut self, p: Point2<f64>) -> TapOutcome {
        debug!("tap at ({:.1}, {:.1}) in {:?} mode", p.x, p.y, self.mode);
        match self.mode {
            TapMode::PointOne => {
                self.point_one = Some(p);
                TapOutcome::PointOne
            }
            TapMode::PointTwo => {
                self.point_two = Some(p);
                let measurement = self.point_one.map(|a| self.measure_points(a, p));
                TapOutcome::PointTwo { measurement }
            }
            TapMode::Reference => {
                if self.reference_a.is_none() {
                    self.reference_a = Some(p);
                    TapOutcome::ReferencePoint { index: 0 }
                } else {
                    self.reference_b = Some(p);
                    TapOutcome::ReferencePoint { index: 1 }
                }
            }
            TapMode::Calibrate => {
                if self.corners.len() >= CORNER_COUNT {
                    self.corners.clear();
                }
                self.corners.push(p);
                TapOutcome::Corner {
                    collected: self.corners.len(),
                }
            }
            TapMode::Idle => TapOutcome::Ignored,
        }
    }

    pub fn point_one(&self) -> Option<Point2<f64>> {
        self.point_one
    }

    pub fn point_two(&self) -> Option<Point2<f64>> {
        self.point_two
    }

    pub fn reference_length(&self) -> f64 {
        self.reference_length
    }

    /// Real length of the reference segment, in meters.
    pub fn set_reference_length(&mut self, meters: f64) {
        self.reference_length = meters;
    }

    /// The reference segment as tapped, valid or not.
    pub fn reference_calibration(&self) -> Option<ReferenceCalibration> {
        match (self.reference_a, self.reference_b) {
            (Some(a), Some(b)) => Some(ReferenceCalibration::new(a, b, self.reference_length)),
            _ => None,
        }
    }

    /// A usable reference calibration, or [`SessionError::ReferenceMissing`].
    pub fn require_reference(&self) -> Result<ReferenceCalibration, SessionError> {
        self.reference_calibration()
            .filter(ReferenceCalibration::is_valid)
            .ok_or(SessionError::ReferenceMissing)
    }

    pub fn corners(&self) -> &[Point2<f64>] {
        &self.corners
    }

    pub fn rectangle_size(&self) -> RectangleSize {
        self.rectangle
    }

    pub fn set_rectangle_size(&mut self, size: RectangleSize) {
        self.rectangle = size;
    }

    /// Estimate a homography from the collected corners and make it active.
    ///
    /// Tap order is not enforced. Corners that do not form a convex quad in
    /// the order given are accepted but logged, since they usually come from
    /// out-of-order taps.
    pub fn apply_calibration(&mut self) -> Result<PlanarCalibration, SessionError> {
        let corners: &[Point2<f64>; CORNER_COUNT] =
            self.corners
                .as_slice()
                .try_into()
                .map_err(|_| SessionError::NotEnoughCorners {
                    got: self.corners.len(),
                })?;
        if !self.rectangle.is_valid() {
            return Err(CalibrationError::InvalidRectangle {
                width: self.rectangle.width,
                height: self.rectangle.height,
            }
            .into());
        }
        if !is_convex_quad(corners) {
            warn!("calibration corners do not form a convex quad; check the tap order");
        }
        let calibration = self.slot.calibrate(corners, self.rectangle)?;
        info!(
            "calibration applied for {} x {} m rectangle",
            self.rectangle.width, self.rectangle.height
        );
        Ok(calibration)
    }

    /// Drop the planar calibration and its corners.
    pub fn clear_calibration(&mut self) {
        self.slot.clear();
        self.corners.clear();
    }

    /// Drop every point and the planar calibration. Lengths and the
    /// rectangle size are kept.
    pub fn clear(&mut self) {
        self.point_one = None;
        self.point_two = None;
        self.reference_a = None;
        self.reference_b = None;
        self.clear_calibration();
    }

    pub fn status(&self) -> CalibrationStatus {
        CalibrationStatus::from_calibrated(self.slot.is_calibrated())
    }

    pub fn slot(&self) -> &CalibrationSlot {
        &self.slot
    }

    /// Distance between two arbitrary image points under the current calibration.
    pub fn measure_points(
        &self,
        a: Point2<f64>,
        b: Point2<f64>,
    ) -> Result<Measurement, MeasurementUnavailable> {
        let reference = self.reference_calibration();
        self.slot
            .measure(&MeasurementRequest::new(a, b), reference.as_ref())
    }

    /// Distance between the two measured points.
    pub fn measure(&self) -> Result<Measurement, SessionError> {
        let (Some(a), Some(b)) = (self.point_one, self.point_two) else {
            return Err(SessionError::MissingPoints);
        };
        Ok(self.measure_points(a, b)?)
    }

    /// The current distance as display text, `"—"` when unavailable.
    pub fn formatted_distance(&self) -> String {
        format_result(&self.measure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planar_measure_core::{HomographyError, MeasurementMethod};

    fn tap_all(session: &mut MeasureSession, mode: TapMode, pts: &[(f64, f64)]) {
        session.set_mode(mode);
        for &(x, y) in pts {
            session.tap(Point2::new(x, y));
        }
    }

    fn with_reference() -> MeasureSession {
        let mut s = MeasureSession::default();
        tap_all(&mut s, TapMode::Reference, &[(0.0, 0.0), (100.0, 0.0)]);
        s.set_reference_length(2.0);
        s
    }

    const RECT_CORNERS: [(f64, f64); 4] = [(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)];

    #[test]
    fn second_tap_measures_immediately() {
        let mut s = with_reference();
        tap_all(&mut s, TapMode::PointOne, &[(10.0, 10.0)]);
        s.set_mode(TapMode::PointTwo);
        let outcome = s.tap(Point2::new(60.0, 10.0));
        let TapOutcome::PointTwo {
            measurement: Some(Ok(m)),
        } = outcome.clone()
        else {
            panic!("expected a measurement, got {outcome:?}");
        };
        assert!((m.meters - 1.0).abs() < 1e-12);
        assert_eq!(s.formatted_distance(), "1.00 m (3.28 ft)");
    }

    #[test]
    fn second_tap_without_first_point_does_not_measure() {
        let mut s = with_reference();
        s.set_mode(TapMode::PointTwo);
        assert_eq!(
            s.tap(Point2::new(1.0, 1.0)),
            TapOutcome::PointTwo { measurement: None }
        );
        assert_eq!(s.measure(), Err(SessionError::MissingPoints));
        assert_eq!(s.formatted_distance(), "—");
    }

    #[test]
    fn reference_taps_fill_a_then_b() {
        let mut s = MeasureSession::default();
        s.set_mode(TapMode::Reference);
        assert_eq!(
            s.tap(Point2::new(0.0, 0.0)),
            TapOutcome::ReferencePoint { index: 0 }
        );
        assert!(s.reference_calibration().is_none());
        assert_eq!(
            s.tap(Point2::new(10.0, 0.0)),
            TapOutcome::ReferencePoint { index: 1 }
        );
        assert_eq!(
            s.tap(Point2::new(20.0, 0.0)),
            TapOutcome::ReferencePoint { index: 1 }
        );
        let r = s.reference_calibration().expect("both points set");
        assert_eq!(r.point_a, Point2::new(0.0, 0.0));
        assert_eq!(r.point_b, Point2::new(20.0, 0.0));
    }

    #[test]
    fn fifth_corner_restarts_collection() {
        let mut s = MeasureSession::default();
        tap_all(&mut s, TapMode::Calibrate, &RECT_CORNERS);
        assert_eq!(s.corners().len(), 4);
        assert_eq!(
            s.tap(Point2::new(7.0, 7.0)),
            TapOutcome::Corner { collected: 1 }
        );
        assert_eq!(s.corners(), &[Point2::new(7.0, 7.0)]);
    }

    #[test]
    fn calibration_needs_four_corners() {
        let mut s = MeasureSession::default();
        tap_all(&mut s, TapMode::Calibrate, &RECT_CORNERS[..3]);
        assert_eq!(
            s.apply_calibration(),
            Err(SessionError::NotEnoughCorners { got: 3 })
        );
        assert_eq!(s.status(), CalibrationStatus::Uncalibrated);
    }

    #[test]
    fn calibration_needs_a_valid_rectangle() {
        let mut s = MeasureSession::default();
        tap_all(&mut s, TapMode::Calibrate, &RECT_CORNERS);
        s.set_rectangle_size(RectangleSize::new(0.0, 1.0));
        assert!(matches!(
            s.apply_calibration(),
            Err(SessionError::Calibration(
                CalibrationError::InvalidRectangle { .. }
            ))
        ));
    }

    #[test]
    fn collinear_corners_fail_and_leave_status_unchanged() {
        let mut s = MeasureSession::default();
        tap_all(
            &mut s,
            TapMode::Calibrate,
            &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)],
        );
        assert!(matches!(
            s.apply_calibration(),
            Err(SessionError::Calibration(CalibrationError::Estimation(
                HomographyError::CollinearPoints { .. }
            )))
        ));
        assert_eq!(s.status(), CalibrationStatus::Uncalibrated);
    }

    #[test]
    fn calibration_overrides_reference_scale() {
        let mut s = with_reference();
        tap_all(&mut s, TapMode::PointOne, &[(0.0, 0.0)]);
        tap_all(&mut s, TapMode::PointTwo, &[(50.0, 0.0)]);
        assert_eq!(
            s.measure().expect("measurable").method,
            MeasurementMethod::ReferenceScale
        );

        tap_all(&mut s, TapMode::Calibrate, &RECT_CORNERS);
        s.set_rectangle_size(RectangleSize::new(4.0, 2.0));
        s.apply_calibration().expect("calibration");
        assert_eq!(s.status(), CalibrationStatus::Calibrated);

        let m = s.measure().expect("measurable");
        assert_eq!(m.method, MeasurementMethod::Homography);
        assert!((m.meters - 2.0).abs() < 1e-9);
    }

    #[test]
    fn clear_calibration_falls_back_to_reference() {
        let mut s = with_reference();
        tap_all(&mut s, TapMode::Calibrate, &RECT_CORNERS);
        s.apply_calibration().expect("calibration");
        s.clear_calibration();
        assert_eq!(s.status(), CalibrationStatus::Uncalibrated);
        assert!(s.corners().is_empty());
        assert!(s.require_reference().is_ok());
    }

    #[test]
    fn clear_drops_points_but_keeps_lengths() {
        let mut s = with_reference();
        tap_all(&mut s, TapMode::PointOne, &[(1.0, 1.0)]);
        tap_all(&mut s, TapMode::Calibrate, &RECT_CORNERS);
        s.set_rectangle_size(RectangleSize::new(2.0, 1.0));
        s.apply_calibration().expect("calibration");

        s.clear();
        assert!(s.point_one().is_none());
        assert!(s.reference_calibration().is_none());
        assert_eq!(s.status(), CalibrationStatus::Uncalibrated);
        assert_eq!(s.reference_length(), 2.0);
        assert_eq!(s.rectangle_size(), RectangleSize::new(2.0, 1.0));
    }

    #[test]
    fn reference_with_zero_length_is_missing() {
        let mut s = with_reference();
        s.set_reference_length(0.0);
        assert_eq!(s.require_reference(), Err(SessionError::ReferenceMissing));
        tap_all(&mut s, TapMode::PointOne, &[(0.0, 0.0)]);
        tap_all(&mut s, TapMode::PointTwo, &[(50.0, 0.0)]);
        assert_eq!(
            s.measure(),
            Err(SessionError::Unavailable(
                MeasurementUnavailable::NoCalibration
            ))
        );
    }

    #[test]
    fn non_finite_tap_renders_placeholder() {
        let mut s = with_reference();
        tap_all(&mut s, TapMode::PointOne, &[(f64::NAN, 0.0)]);
        tap_all(&mut s, TapMode::PointTwo, &[(50.0, 0.0)]);
        assert!(matches!(
            s.measure(),
            Err(SessionError::Unavailable(
                MeasurementUnavailable::InvalidPoint { .. }
            ))
        ));
        assert_eq!(s.formatted_distance(), "—");
    }

    #[test]
    fn first_point_mode_is_the_default() {
        let mut s = with_reference();
        assert_eq!(MeasureSession::default().mode(), TapMode::PointOne);
        s.set_mode(TapMode::default());
        assert_eq!(s.tap(Point2::new(4.0, 2.0)), TapOutcome::PointOne);
        assert_eq!(s.point_one(), Some(Point2::new(4.0, 2.0)));
    }

    #[test]
    fn idle_mode_ignores_taps() {
        let mut s = MeasureSession::default();
        s.set_mode(TapMode::Idle);
        assert_eq!(s.tap(Point2::new(3.0, 3.0)), TapOutcome::Ignored);
        assert!(s.point_one().is_none());
    }

    #[test]
    fn out_of_order_corners_still_calibrate() {
        let mut s = MeasureSession::default();
        let [tl, tr, br, bl] = RECT_CORNERS;
        tap_all(&mut s, TapMode::Calibrate, &[tl, tr, bl, br]);
        assert!(s.apply_calibration().is_ok());
    }
}
