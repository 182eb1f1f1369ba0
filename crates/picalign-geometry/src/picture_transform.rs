use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};

use crate::affine::{affine_from_pairs, invert_affine, similarity_from_pairs};
use crate::error::GeometryError;

/// A source point of the picture paired with the position it is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Origin point in picture space.
    pub source: DVec2,
    /// Position of the origin point in working space.
    pub target: DVec2,
}

/// Affine map from picture space to working space driven by point correspondences.
///
/// Every mutation re-solves the map from the current pairs:
///
/// - fewer than two pairs: identity;
/// - two pairs, or collinear sources: similarity (rotation, uniform scale, translation);
/// - three or more pairs: full affine, exact on three points and least-squares beyond.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureTransform {
    pairs: Vec<Correspondence>,
    forward: DAffine2,
    inverse: Result<DAffine2, GeometryError>,
}

impl Default for PictureTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl PictureTransform {
    /// Creates an identity transform without origin points.
    pub fn new() -> Self {
        Self {
            pairs: Vec::with_capacity(3),
            forward: DAffine2::IDENTITY,
            inverse: Ok(DAffine2::IDENTITY),
        }
    }

    /// Creates a transform from a list of correspondences.
    pub fn from_pairs(pairs: Vec<Correspondence>) -> Self {
        let mut transform = Self {
            pairs,
            forward: DAffine2::IDENTITY,
            inverse: Ok(DAffine2::IDENTITY),
        };
        transform.solve();
        transform
    }

    /// The current correspondences in insertion order.
    pub fn pairs(&self) -> &[Correspondence] {
        &self.pairs
    }

    /// The origin points in insertion order.
    pub fn origin_points(&self) -> Vec<DVec2> {
        self.pairs.iter().map(|p| p.source).collect()
    }

    /// The working space positions of the origin points in insertion order.
    pub fn target_points(&self) -> Vec<DVec2> {
        self.pairs.iter().map(|p| p.target).collect()
    }

    /// The forward map from picture space to working space.
    pub fn matrix(&self) -> DAffine2 {
        self.forward
    }

    /// Whether the forward map is the identity up to round-off.
    pub fn is_identity(&self) -> bool {
        self.forward.abs_diff_eq(DAffine2::IDENTITY, 1e-9)
    }

    /// Adds an origin point.
    ///
    /// The new pin is paired with its current image under the map, so adding it does not move
    /// the picture.
    pub fn add_origin_point(&mut self, point: DVec2) {
        let target = self.forward.transform_point2(point);
        self.pairs.push(Correspondence {
            source: point,
            target,
        });
        self.solve();
    }

    /// Moves an origin point to a new picture position without moving the picture.
    pub fn replace_origin_point(&mut self, old: DVec2, new: DVec2) -> Result<(), GeometryError> {
        let target = self.forward.transform_point2(new);
        let pair = self.find_mut(old)?;
        pair.source = new;
        pair.target = target;
        self.solve();
        Ok(())
    }

    /// Removes an origin point.
    ///
    /// Returns `false` when the point is not an origin point.
    pub fn remove_origin_point(&mut self, point: DVec2) -> bool {
        match self.pairs.iter().position(|p| p.source == point) {
            Some(index) => {
                self.pairs.remove(index);
                self.solve();
                true
            }
            None => false,
        }
    }

    /// Sets the working space position of an existing origin point.
    ///
    /// # Arguments
    ///
    /// * `source` - An origin point already present in the transform.
    /// * `target` - The position the origin point is mapped to.
    pub fn update_pair(&mut self, source: DVec2, target: DVec2) -> Result<(), GeometryError> {
        self.find_mut(source)?.target = target;
        self.solve();
        Ok(())
    }

    /// Discards all correspondences and returns to the identity map.
    pub fn reset_calibration(&mut self) {
        self.pairs.clear();
        self.forward = DAffine2::IDENTITY;
        self.inverse = Ok(DAffine2::IDENTITY);
    }

    /// Maps a point from picture space to working space.
    pub fn transform_point(&self, point: DVec2) -> DVec2 {
        self.forward.transform_point2(point)
    }

    /// Maps a point from working space back to picture space.
    ///
    /// Fails with [`GeometryError::NonInvertibleTransform`] while the map is singular, e.g. when
    /// the targets of three pairs are collinear.
    pub fn inverse_transform_point(&self, point: DVec2) -> Result<DVec2, GeometryError> {
        self.inverse
            .as_ref()
            .map(|inv| inv.transform_point2(point))
            .map_err(Clone::clone)
    }

    fn find_mut(&mut self, source: DVec2) -> Result<&mut Correspondence, GeometryError> {
        self.pairs
            .iter_mut()
            .find(|p| p.source == source)
            .ok_or(GeometryError::UnknownOriginPoint(source.x, source.y))
    }

    fn solve(&mut self) {
        let sources = self.origin_points();
        let targets = self.target_points();

        self.forward = match sources.len() {
            0 | 1 => DAffine2::IDENTITY,
            2 => similarity_from_pairs(&sources, &targets),
            _ => affine_from_pairs(&sources, &targets)
                .unwrap_or_else(|| similarity_from_pairs(&sources, &targets)),
        };
        self.inverse = invert_affine(&self.forward);

        log::debug!(
            "picture transform solved from {} pairs: {:?}",
            sources.len(),
            self.forward
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_point_eq(a: DVec2, b: DVec2) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
    }

    fn triangle() -> [DVec2; 3] {
        [
            DVec2::new(0.0, 0.0),
            DVec2::new(100.0, 0.0),
            DVec2::new(100.0, 100.0),
        ]
    }

    fn pinned(points: &[DVec2]) -> PictureTransform {
        let mut transform = PictureTransform::new();
        for p in points {
            transform.add_origin_point(*p);
        }
        transform
    }

    #[test]
    fn test_new_is_identity() {
        let transform = PictureTransform::new();
        assert!(transform.is_identity());
        assert!(transform.origin_points().is_empty());
        assert_eq!(
            transform.inverse_transform_point(DVec2::new(3.0, 4.0)),
            Ok(DVec2::new(3.0, 4.0))
        );
    }

    #[test]
    fn test_adding_points_keeps_map() {
        let transform = pinned(&triangle());
        assert_eq!(transform.origin_points(), triangle().to_vec());
        assert!(transform.is_identity());
    }

    #[test]
    fn test_single_pair_is_identity() {
        let mut transform = pinned(&triangle()[..1]);
        transform
            .update_pair(DVec2::ZERO, DVec2::new(50.0, 50.0))
            .unwrap();
        assert!(transform.is_identity());
        assert_eq!(transform.target_points(), vec![DVec2::new(50.0, 50.0)]);
    }

    #[test]
    fn test_two_pairs_similarity() -> Result<(), GeometryError> {
        let mut transform = pinned(&triangle()[..2]);
        // scale by 2 around the first pin
        transform.update_pair(DVec2::new(100.0, 0.0), DVec2::new(200.0, 0.0))?;

        assert_point_eq(
            transform.transform_point(DVec2::new(0.0, 50.0)),
            DVec2::new(0.0, 100.0),
        );
        Ok(())
    }

    #[test]
    fn test_three_pairs_affine_roundtrip() -> Result<(), GeometryError> {
        let mut transform = pinned(&triangle());
        let targets = [
            DVec2::new(10.0, 20.0),
            DVec2::new(310.0, 20.0),
            DVec2::new(330.0, 220.0),
        ];
        for (s, t) in triangle().iter().zip(targets.iter()) {
            transform.update_pair(*s, *t)?;
        }

        for (s, t) in triangle().iter().zip(targets.iter()) {
            let forward = transform.transform_point(*s);
            assert_point_eq(forward, *t);
            assert_point_eq(transform.inverse_transform_point(forward)?, *s);
        }
        Ok(())
    }

    #[test]
    fn test_collinear_targets_not_invertible() -> Result<(), GeometryError> {
        let mut transform = pinned(&triangle());
        transform.update_pair(DVec2::new(0.0, 0.0), DVec2::new(0.0, 0.0))?;
        transform.update_pair(DVec2::new(100.0, 0.0), DVec2::new(10.0, 10.0))?;
        transform.update_pair(DVec2::new(100.0, 100.0), DVec2::new(20.0, 20.0))?;

        assert!(matches!(
            transform.inverse_transform_point(DVec2::new(1.0, 1.0)),
            Err(GeometryError::NonInvertibleTransform { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_collinear_sources_fall_back_to_similarity() -> Result<(), GeometryError> {
        let points = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(2.0, 0.0),
        ];
        let mut transform = pinned(&points);
        transform.update_pair(points[1], DVec2::new(0.0, 1.0))?;
        transform.update_pair(points[2], DVec2::new(0.0, 2.0))?;

        // a rotation by 90 degrees around the origin
        assert_point_eq(
            transform.transform_point(DVec2::new(0.0, 1.0)),
            DVec2::new(-1.0, 0.0),
        );
        Ok(())
    }

    #[test]
    fn test_replace_origin_point_keeps_map() -> Result<(), GeometryError> {
        let mut transform = pinned(&triangle());
        transform.update_pair(DVec2::new(100.0, 0.0), DVec2::new(200.0, 0.0))?;
        let before = transform.matrix();

        transform.replace_origin_point(DVec2::new(100.0, 100.0), DVec2::new(0.0, 100.0))?;

        let after = transform.matrix();
        assert_point_eq(after.translation, before.translation);
        assert_point_eq(after.matrix2.x_axis, before.matrix2.x_axis);
        assert_point_eq(after.matrix2.y_axis, before.matrix2.y_axis);
        assert_eq!(transform.origin_points()[2], DVec2::new(0.0, 100.0));
        Ok(())
    }

    #[test]
    fn test_unknown_origin_point() {
        let mut transform = pinned(&triangle());
        assert_eq!(
            transform.update_pair(DVec2::new(1.0, 2.0), DVec2::ZERO),
            Err(GeometryError::UnknownOriginPoint(1.0, 2.0))
        );
        assert!(transform
            .replace_origin_point(DVec2::new(1.0, 2.0), DVec2::ZERO)
            .is_err());
        assert!(!transform.remove_origin_point(DVec2::new(1.0, 2.0)));
    }

    #[test]
    fn test_remove_origin_point() -> Result<(), GeometryError> {
        let mut transform = pinned(&triangle());
        transform.update_pair(DVec2::new(100.0, 100.0), DVec2::new(120.0, 100.0))?;
        assert!(!transform.is_identity());

        assert!(transform.remove_origin_point(DVec2::new(100.0, 100.0)));
        assert_eq!(transform.origin_points().len(), 2);
        // the remaining pins are untouched so the similarity fit is the identity
        assert_point_eq(
            transform.transform_point(DVec2::new(30.0, 40.0)),
            DVec2::new(30.0, 40.0),
        );
        Ok(())
    }

    #[test]
    fn test_reset_calibration() -> Result<(), GeometryError> {
        let mut transform = pinned(&triangle());
        transform.update_pair(DVec2::new(100.0, 0.0), DVec2::new(300.0, 0.0))?;
        assert!(!transform.is_identity());

        transform.reset_calibration();
        assert!(transform.is_identity());
        assert!(transform.pairs().is_empty());
        Ok(())
    }

    #[test]
    fn test_from_pairs() {
        let transform = PictureTransform::from_pairs(vec![
            Correspondence {
                source: DVec2::new(0.0, 0.0),
                target: DVec2::new(1.0, 1.0),
            },
            Correspondence {
                source: DVec2::new(1.0, 0.0),
                target: DVec2::new(2.0, 1.0),
            },
        ]);
        assert_point_eq(
            transform.transform_point(DVec2::new(5.0, 5.0)),
            DVec2::new(6.0, 6.0),
        );
    }
}
