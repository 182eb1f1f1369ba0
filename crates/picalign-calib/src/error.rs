use picalign_geometry::GeometryError;

/// Degenerate input to the reference point correction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorrectionError {
    /// The correction needs exactly three reference points.
    #[error("Reference point correction requires exactly 3 points, got {0}")]
    WrongPointCount(usize),

    /// Two consecutive reference points coincide so the segment has no bearing.
    #[error("Reference points {0} and {1} coincide")]
    CoincidentPoints(usize, usize),

    /// A target distance is not a positive finite number of meters.
    #[error("Invalid target distance: {0} m")]
    InvalidDistance(f64),
}

/// A calibration attempt could not start.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreconditionError {
    /// No picture layer is being calibrated.
    #[error("No picture layer selected for calibration")]
    MissingLayer,

    /// The picture does not hold exactly three origin points.
    #[error("Calibration requires 3 origin points, got {0}")]
    OriginPointCount(usize),

    /// The session does not hold exactly three reference points.
    #[error("Calibration requires 3 reference points, got {0}")]
    ReferencePointCount(usize),

    /// One of the two distances is zero.
    #[error("Distances between the points must not be zero")]
    ZeroDistance,

    /// A guided reference point needs the distance that is still missing.
    #[error("The distance for the next reference point is not set")]
    MissingDistance,

    /// The point list already holds three points.
    #[error("Point list already holds {0} points")]
    PointListFull(usize),

    /// No reference point was found near the picked position.
    #[error("No reference point near ({0}, {1})")]
    NoNearbyPoint(f64, f64),

    /// A distance entered as text is not a number.
    #[error("Invalid distance: {0:?}")]
    InvalidDistanceText(String),

    /// The reference points are degenerate.
    #[error(transparent)]
    MalformedInput(#[from] CorrectionError),
}

/// Errors reported by the calibration controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    /// The calibration did not run; nothing was changed.
    #[error("Calibration precondition failed: {0}")]
    PreconditionFailed(#[from] PreconditionError),

    /// The calibrated picture would be distorted; the transform was reset.
    #[error(
        "Calibrated side ratios {reference:?} deviate from the picture side ratios {origin:?}"
    )]
    DimensionMismatch {
        /// Side ratios `[1, d12/d01, d02/d01]` of the origin triangle.
        origin: [f64; 3],
        /// Side ratios `[1, d12/d01, d02/d01]` of the corrected reference triangle.
        reference: [f64; 3],
    },

    /// A point conversion failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
