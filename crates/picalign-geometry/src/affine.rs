use glam::{DAffine2, DMat2, DVec2};

use crate::error::GeometryError;

// relative threshold used for rank checks on 2x2 systems
const RANK_EPS: f64 = 1e-12;

fn centroid(points: &[DVec2]) -> DVec2 {
    points.iter().copied().sum::<DVec2>() / points.len() as f64
}

/// Fits a similarity transform (rotation, uniform scale and translation) to point pairs.
///
/// The fit is least-squares for more than two pairs and exact for two distinct source points.
/// When all source points coincide only the translation between the centroids is kept.
///
/// # Arguments
///
/// * `src_points` - The source points.
/// * `dst_points` - The target points, one per source point.
///
/// # Returns
///
/// The fitted map, or the identity when no pairs are given.
///
/// PRECONDITION: `src_points` and `dst_points` have the same length.
pub fn similarity_from_pairs(src_points: &[DVec2], dst_points: &[DVec2]) -> DAffine2 {
    debug_assert_eq!(src_points.len(), dst_points.len());

    if src_points.is_empty() {
        return DAffine2::IDENTITY;
    }

    let src_c = centroid(src_points);
    let dst_c = centroid(dst_points);

    // treat points as complex numbers: dst - dst_c = a * (src - src_c)
    let mut num = DVec2::ZERO;
    let mut den = 0.0;
    for (s, d) in src_points.iter().zip(dst_points.iter()) {
        let z = *s - src_c;
        let w = *d - dst_c;
        // w * conj(z)
        num += DVec2::new(w.x * z.x + w.y * z.y, w.y * z.x - w.x * z.y);
        den += z.length_squared();
    }

    let a = if den > 0.0 {
        num / den
    } else {
        DVec2::new(1.0, 0.0)
    };

    let matrix2 = DMat2::from_cols(DVec2::new(a.x, a.y), DVec2::new(-a.y, a.x));
    let translation = dst_c - matrix2 * src_c;

    DAffine2::from_mat2_translation(matrix2, translation)
}

/// Fits a full 2D affine transform to point pairs.
///
/// The fit is least-squares for more than three pairs and exact for three non-collinear source
/// points.
///
/// # Arguments
///
/// * `src_points` - The source points.
/// * `dst_points` - The target points, one per source point.
///
/// # Returns
///
/// The fitted map, or `None` when there are fewer than three pairs or the source points are
/// collinear.
///
/// # Example
///
/// ```
/// use picalign_geometry::{affine_from_pairs, DVec2};
///
/// let src = [DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0)];
/// let dst = [DVec2::new(1.0, 1.0), DVec2::new(3.0, 1.0), DVec2::new(1.0, 4.0)];
///
/// let m = affine_from_pairs(&src, &dst).unwrap();
/// let p = m.transform_point2(DVec2::new(1.0, 1.0));
/// assert!((p - DVec2::new(3.0, 4.0)).length() < 1e-9);
/// ```
pub fn affine_from_pairs(src_points: &[DVec2], dst_points: &[DVec2]) -> Option<DAffine2> {
    debug_assert_eq!(src_points.len(), dst_points.len());

    if src_points.len() < 3 {
        return None;
    }

    let src_c = centroid(src_points);
    let dst_c = centroid(dst_points);

    // accumulate the centered normal equations
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    let mut rhs_x = DVec2::ZERO;
    let mut rhs_y = DVec2::ZERO;
    for (s, d) in src_points.iter().zip(dst_points.iter()) {
        let z = *s - src_c;
        let w = *d - dst_c;
        sxx += z.x * z.x;
        sxy += z.x * z.y;
        syy += z.y * z.y;
        rhs_x += z * w.x;
        rhs_y += z * w.y;
    }

    let cov = DMat2::from_cols(DVec2::new(sxx, sxy), DVec2::new(sxy, syy));
    let det = cov.determinant();
    let scale = (sxx + syy) * (sxx + syy);
    if !det.is_finite() || det.abs() <= RANK_EPS * scale {
        log::debug!("affine fit: collinear source points (det = {det:e})");
        return None;
    }

    let cov_inv = cov.inverse();
    let row_x = cov_inv * rhs_x;
    let row_y = cov_inv * rhs_y;

    let matrix2 = DMat2::from_cols(DVec2::new(row_x.x, row_y.x), DVec2::new(row_x.y, row_y.y));
    let translation = dst_c - matrix2 * src_c;

    Some(DAffine2::from_mat2_translation(matrix2, translation))
}

/// Inverts a 2D affine transform.
///
/// # Arguments
///
/// * `m` - The affine transform to invert.
///
/// # Returns
///
/// The inverse transform, or [`GeometryError::NonInvertibleTransform`] when the linear part is
/// singular.
pub fn invert_affine(m: &DAffine2) -> Result<DAffine2, GeometryError> {
    let (a, b) = (m.matrix2.x_axis.x, m.matrix2.y_axis.x);
    let (d, e) = (m.matrix2.x_axis.y, m.matrix2.y_axis.y);
    let (c, f) = (m.translation.x, m.translation.y);

    let determinant = a * e - b * d;
    let norm = a * a + b * b + d * d + e * e;
    if !determinant.is_finite() || determinant.abs() <= RANK_EPS * norm {
        return Err(GeometryError::NonInvertibleTransform { determinant });
    }

    let inv_determinant = 1.0 / determinant;

    let new_a = e * inv_determinant;
    let new_b = -b * inv_determinant;
    let new_d = -d * inv_determinant;
    let new_e = a * inv_determinant;
    let new_c = -(new_a * c + new_b * f);
    let new_f = -(new_d * c + new_e * f);

    Ok(DAffine2::from_mat2_translation(
        DMat2::from_cols(DVec2::new(new_a, new_d), DVec2::new(new_b, new_e)),
        DVec2::new(new_c, new_f),
    ))
}
