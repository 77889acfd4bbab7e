//! Tap-to-measure on top of [`planar_measure_core`].
//!
//! This crate provides:
//! - [`session::MeasureSession`]: the point-collection state of a measuring
//!   screen (measured points, reference segment, calibration corners);
//! - [`format`]: meters/feet display text and calibration status labels;
//! - [`scene`]: JSON scene files replayed through a session, used by the
//!   `planar-measure` CLI (feature `cli`).
//!
//! ## Quickstart
//!
//! ```
//! use nalgebra::Point2;
//! use planar_measure::session::{MeasureSession, TapMode};
//!
//! let mut session = MeasureSession::default();
//! session.set_mode(TapMode::Reference);
//! session.tap(Point2::new(0.0, 0.0));
//! session.tap(Point2::new(100.0, 0.0));
//! session.set_reference_length(2.0);
//!
//! session.set_mode(TapMode::PointOne);
//! session.tap(Point2::new(0.0, 0.0));
//! session.set_mode(TapMode::PointTwo);
//! session.tap(Point2::new(50.0, 0.0));
//!
//! assert_eq!(session.formatted_distance(), "1.00 m (3.28 ft)");
//! ```

pub use planar_measure_core as core;

pub mod format;
pub mod scene;
pub mod session;

pub use format::CalibrationStatus;
pub use scene::{Scene, SceneError, SceneReport};
pub use session::{MeasureSession, SessionError, TapMode, TapOutcome};
