#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Picalign Geometry
//!
//! Geometry primitives shared by the picture calibration engine.
//!
//! - **GeoLine**: great-circle length of a segment between two `(lon, lat)` points and linear
//!   interpolation along it.
//! - **Affine solvers**: similarity and full affine maps fitted to point correspondences.
//! - **PictureTransform**: the point-pair driven affine map that places a picture in its
//!   working space.
//!
//! ## Example
//!
//! ```rust
//! use picalign_geometry::{DVec2, PictureTransform};
//!
//! let mut transform = PictureTransform::new();
//! transform.add_origin_point(DVec2::new(0.0, 0.0));
//! transform.add_origin_point(DVec2::new(10.0, 0.0));
//! transform.add_origin_point(DVec2::new(0.0, 10.0));
//!
//! // stretch the picture horizontally
//! transform.update_pair(DVec2::new(10.0, 0.0), DVec2::new(20.0, 0.0))?;
//!
//! let p = transform.transform_point(DVec2::new(5.0, 5.0));
//! assert!((p.x - 10.0).abs() < 1e-9);
//! # Ok::<(), picalign_geometry::GeometryError>(())
//! ```

/// Affine map fitting and inversion.
pub mod affine;

/// Error types for the geometry module.
pub mod error;

/// Geodesic segments between geographic points.
pub mod geo_line;

/// Point-pair driven picture transform.
pub mod picture_transform;

pub use affine::{affine_from_pairs, invert_affine, similarity_from_pairs};
pub use error::GeometryError;
pub use geo_line::{haversine_distance, GeoLine, EARTH_MEAN_RADIUS};
pub use picture_transform::{Correspondence, PictureTransform};

#[doc(no_inline)]
pub use glam::{DAffine2, DMat2, DVec2};

/// A 2D point.
///
/// Depending on the context the coordinates are `(longitude, latitude)` in degrees, picture
/// pixels, or working space units. Conversions between spaces are always explicit.
pub type Point2D = DVec2;
