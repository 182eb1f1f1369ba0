#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Picalign Calib
//!
//! A picture is calibrated by picking three origin points on it and three reference points on
//! the map, together with the measured distances between the reference points. The reference
//! points are corrected to the distances, the picture transform is fitted to the pairs and the
//! result is rejected when it would distort the picture.
//!
//! The host application supplies the map view, the picture layer and, optionally, a set of
//! existing points to snap to, see [`host`].

/// Calibration engine configuration.
pub mod config;

/// The calibration state machine.
pub mod controller;

/// Distance correction of the reference points.
pub mod corrector;

/// Error types for the calibration module.
pub mod error;

/// Collaborators supplied by the host application.
pub mod host;

/// Point lists with size-change notification.
pub mod point_list;

/// Plausibility check of a calibration.
pub mod validator;

pub use config::{CalibrationConfig, TriangleMetric};
pub use controller::{
    parse_distance, AutoCalibration, CalibrationOutcome, CalibrationReport, CalibrationSession,
    CalibrationState, PointListEvent, PointRole, POINTS_PER_ROLE,
};
pub use corrector::correct_reference_points;
pub use error::{CalibrationError, CorrectionError, PreconditionError};
pub use host::{
    MapView, MercatorView, NearbyPoints, PictureLayer, PlacedPicture, PointQuery,
};
pub use point_list::{ObservableList, PointList, SizeChange};
pub use validator::{side_ratios, CalibrationValidator, ValidationReport};
