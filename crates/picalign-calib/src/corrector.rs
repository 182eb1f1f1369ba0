use glam::DVec2;
use picalign_geometry::GeoLine;

use crate::error::CorrectionError;

/// Corrects three reference points so that their spacing matches two known distances.
///
/// The first point is kept as the anchor. The second point is moved along the original bearing
/// of segment 0→1 to lie `distance_01` meters from the anchor. The third point is placed
/// `distance_12` meters from the *original* second point along segment 1→2 and then shifted by
/// the same `(Δlon, Δlat)` that was applied to the second point, so it stays consistent with the
/// corrected second point.
///
/// Positions along a segment are interpolated linearly in latitude and longitude, see
/// [`GeoLine::point_on_line`].
///
/// # Arguments
///
/// * `points` - The reference points as `(longitude, latitude)` in degrees.
/// * `distance_01` - Target distance between the first and second point in meters.
/// * `distance_12` - Target distance between the second and third point in meters.
///
/// # Returns
///
/// The three corrected points in the same order.
///
/// # Example
///
/// ```
/// use picalign_calib::correct_reference_points;
/// use picalign_geometry::DVec2;
///
/// let points = [
///     DVec2::new(0.0, 0.0),
///     DVec2::new(0.001, 0.0),
///     DVec2::new(0.001, 0.001),
/// ];
/// let corrected = correct_reference_points(&points, 100.0, 100.0)?;
/// assert_eq!(corrected[0], points[0]);
/// # Ok::<(), picalign_calib::error::CorrectionError>(())
/// ```
pub fn correct_reference_points(
    points: &[DVec2],
    distance_01: f64,
    distance_12: f64,
) -> Result<[DVec2; 3], CorrectionError> {
    let &[p0, p1, p2] = points else {
        return Err(CorrectionError::WrongPointCount(points.len()));
    };

    for distance in [distance_01, distance_12] {
        if !(distance.is_finite() && distance > 0.0) {
            return Err(CorrectionError::InvalidDistance(distance));
        }
    }

    let line_01 = GeoLine::new(p0, p1);
    let line_12 = GeoLine::new(p1, p2);

    let corrected_1 = line_01
        .try_point_on_line(distance_01)
        .ok_or(CorrectionError::CoincidentPoints(0, 1))?;
    let offset = corrected_1 - p1;

    let corrected_2 = line_12
        .try_point_on_line(distance_12)
        .ok_or(CorrectionError::CoincidentPoints(1, 2))?
        + offset;

    log::debug!(
        "corrected reference points: {p1:?} -> {corrected_1:?}, {p2:?} -> {corrected_2:?}"
    );

    Ok([p0, corrected_1, corrected_2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    // length of a lat/lon-plane step expressed with the interpolation rule of `GeoLine`
    fn interpolated_length(line: &GeoLine, from: DVec2, to: DVec2) -> f64 {
        (to - from).length() / (line.end() - line.start()).length() * line.distance()
    }

    fn scenario() -> [DVec2; 3] {
        [
            DVec2::new(0.0, 0.0),
            DVec2::new(0.001, 0.0),
            DVec2::new(0.001, 0.001),
        ]
    }

    #[test]
    fn test_scenario_points() -> Result<(), CorrectionError> {
        let points = scenario();
        let corrected = correct_reference_points(&points, 100.0, 100.0)?;

        assert_eq!(corrected[0], points[0]);

        // the second point stays on the equator, 100 m east of the anchor
        assert_relative_eq!(corrected[1].y, 0.0);
        assert_relative_eq!(
            picalign_geometry::haversine_distance(corrected[0], corrected[1]),
            100.0,
            max_relative = 1e-9
        );

        // the third point is 100 m north of the corrected second point
        assert_relative_eq!(corrected[2].x, corrected[1].x, epsilon = 1e-15);
        assert_relative_eq!(
            picalign_geometry::haversine_distance(corrected[1], corrected[2]),
            100.0,
            max_relative = 1e-6
        );
        Ok(())
    }

    #[test]
    fn test_anchor_and_distance_invariants() -> Result<(), CorrectionError> {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let base = DVec2::new(
                rng.random_range(-170.0..170.0),
                rng.random_range(-60.0..60.0),
            );
            let points = [
                base,
                base + DVec2::new(rng.random_range(0.0005..0.01), rng.random_range(-0.01..0.01)),
                base + DVec2::new(rng.random_range(-0.01..0.01), rng.random_range(0.0005..0.01)),
            ];
            let d01 = rng.random_range(1.0..2000.0);
            let d12 = rng.random_range(1.0..2000.0);

            let corrected = correct_reference_points(&points, d01, d12)?;
            assert_eq!(corrected[0], points[0]);

            let line_01 = GeoLine::new(points[0], points[1]);
            let line_12 = GeoLine::new(points[1], points[2]);
            assert_relative_eq!(
                interpolated_length(&line_01, corrected[0], corrected[1]),
                d01,
                max_relative = 1e-6
            );
            assert_relative_eq!(
                interpolated_length(&line_12, corrected[1], corrected[2]),
                d12,
                max_relative = 1e-6
            );
        }
        Ok(())
    }

    #[test]
    fn test_wrong_point_count() {
        let points = scenario();
        assert_eq!(
            correct_reference_points(&points[..2], 1.0, 1.0),
            Err(CorrectionError::WrongPointCount(2))
        );
        let four = [points[0], points[1], points[2], points[0]];
        assert_eq!(
            correct_reference_points(&four, 1.0, 1.0),
            Err(CorrectionError::WrongPointCount(4))
        );
    }

    #[test]
    fn test_coincident_points() {
        let p = DVec2::new(7.0, 50.0);
        let q = DVec2::new(7.001, 50.0);
        assert_eq!(
            correct_reference_points(&[p, p, q], 10.0, 10.0),
            Err(CorrectionError::CoincidentPoints(0, 1))
        );
        assert_eq!(
            correct_reference_points(&[p, q, q], 10.0, 10.0),
            Err(CorrectionError::CoincidentPoints(1, 2))
        );
    }

    #[test]
    fn test_invalid_distance() {
        let points = scenario();
        assert_eq!(
            correct_reference_points(&points, 0.0, 10.0),
            Err(CorrectionError::InvalidDistance(0.0))
        );
        assert_eq!(
            correct_reference_points(&points, 10.0, -5.0),
            Err(CorrectionError::InvalidDistance(-5.0))
        );
        assert!(correct_reference_points(&points, f64::NAN, 10.0).is_err());
    }
}
