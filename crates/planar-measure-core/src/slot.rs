//! The active planar calibration.
//!
//! At most one [`PlanarCalibration`] is active. It starts absent, is replaced
//! by every successful estimate and is dropped on an explicit clear. Readers
//! always see either the previous or the new calibration in full.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, warn};
use nalgebra::Point2;

use crate::calibration::{CalibrationError, PlanarCalibration, RectangleSize, ReferenceCalibration};
use crate::distance::{measure, Measurement, MeasurementRequest, MeasurementUnavailable};
use crate::params::MeasureParams;

#[derive(Debug, Default)]
pub struct CalibrationSlot {
    params: MeasureParams,
    active: RwLock<Option<PlanarCalibration>>,
}

impl CalibrationSlot {
    pub fn new(params: MeasureParams) -> Self {
        Self {
            params,
            active: RwLock::new(None),
        }
    }

    pub fn params(&self) -> &MeasureParams {
        &self.params
    }

    /// Snapshot of the active calibration.
    pub fn current(&self) -> Option<PlanarCalibration> {
        *self.read()
    }

    pub fn is_calibrated(&self) -> bool {
        self.read().is_some()
    }

    /// Make `calibration` active, returning the one it replaces.
    pub fn install(&self, calibration: PlanarCalibration) -> Option<PlanarCalibration> {
        let previous = self.write().replace(calibration);
        debug!(
            "planar calibration installed (replaced previous: {})",
            previous.is_some()
        );
        previous
    }

    /// Drop the active calibration, returning it.
    pub fn clear(&self) -> Option<PlanarCalibration> {
        let previous = self.write().take();
        if previous.is_some() {
            debug!("planar calibration cleared");
        }
        previous
    }

    /// Estimate a calibration from four rectangle corners and install it.
    ///
    /// On failure the currently active calibration is left untouched.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, corners)))]
    pub fn calibrate(
        &self,
        corners: &[Point2<f64>],
        size: RectangleSize,
    ) -> Result<PlanarCalibration, CalibrationError> {
        match PlanarCalibration::from_rectangle(corners, size, &self.params) {
            Ok(calibration) => {
                self.install(calibration);
                Ok(calibration)
            }
            Err(err) => {
                warn!("calibration rejected: {err}");
                Err(err)
            }
        }
    }

    /// Measure against the active calibration, falling back to `reference`
    /// only when no planar calibration is installed.
    pub fn measure(
        &self,
        request: &MeasurementRequest,
        reference: Option<&ReferenceCalibration>,
    ) -> Result<Measurement, MeasurementUnavailable> {
        let planar = self.current();
        measure(request, planar.as_ref(), reference)
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<PlanarCalibration>> {
        self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<PlanarCalibration>> {
        self.active.write().unwrap_or_else(PoisonError::into_inner)
    }
}
