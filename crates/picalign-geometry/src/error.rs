/// An error type for the geometry module.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The affine map is singular and cannot be inverted.
    #[error("Affine transform is not invertible (determinant {determinant})")]
    NonInvertibleTransform {
        /// Determinant of the linear part of the map.
        determinant: f64,
    },

    /// The point is not one of the transform's origin points.
    #[error("Point ({0}, {1}) is not an origin point of the transform")]
    UnknownOriginPoint(f64, f64),
}
