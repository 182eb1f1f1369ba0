use glam::DVec2;
use picalign_geometry::haversine_distance;

use crate::config::{CalibrationConfig, TriangleMetric};

/// Side ratios of two triangles and the verdict of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ValidationReport {
    /// Side ratios `[1, d12/d01, d02/d01]` of the origin triangle.
    pub origin_ratios: [f64; 3],
    /// Side ratios `[1, d12/d01, d02/d01]` of the reference triangle.
    pub reference_ratios: [f64; 3],
    /// Whether the reference ratios are within tolerance of the origin ratios.
    pub accepted: bool,
}

/// Normalized side ratios `[1, d12/d01, d02/d01]` of a triangle.
///
/// Returns `None` unless exactly three points are given.
pub fn side_ratios(points: &[DVec2], metric: TriangleMetric) -> Option<[f64; 3]> {
    let &[p0, p1, p2] = points else {
        return None;
    };
    Some(triangle_ratios(&[p0, p1, p2], metric))
}

fn triangle_ratios(&[p0, p1, p2]: &[DVec2; 3], metric: TriangleMetric) -> [f64; 3] {
    let distance = |a: DVec2, b: DVec2| match metric {
        TriangleMetric::Planar => a.distance(b),
        TriangleMetric::Geodesic => haversine_distance(a, b),
    };

    let d01 = distance(p0, p1);
    let d12 = distance(p1, p2);
    let d02 = distance(p0, p2);

    [1.0, d12 / d01, d02 / d01]
}

/// Rejects calibrations that would visibly distort the picture.
///
/// The origin triangle picked on the picture and the corrected reference triangle are compared
/// through their side ratios normalized to the first side. The check is loose on purpose: it
/// catches swapped points or distances in the wrong unit, not small metric errors.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationValidator {
    tolerance: f64,
    origin_metric: TriangleMetric,
}

impl Default for CalibrationValidator {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

impl CalibrationValidator {
    /// Creates a validator from the engine configuration.
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            tolerance: config.ratio_tolerance,
            origin_metric: config.origin_metric,
        }
    }

    /// Compares the origin triangle against the corrected reference triangle.
    ///
    /// # Arguments
    ///
    /// * `origin` - The three origin points, measured with the configured metric.
    /// * `reference` - The three corrected reference points as `(longitude, latitude)`.
    ///
    /// # Returns
    ///
    /// `None` when either triangle does not have exactly three points, otherwise the report.
    /// Degenerate triangles produce non-finite ratios and are never accepted.
    pub fn check(&self, origin: &[DVec2], reference: &[DVec2]) -> Option<ValidationReport> {
        let (&[o0, o1, o2], &[r0, r1, r2]) = (origin, reference) else {
            return None;
        };
        Some(self.compare(&[o0, o1, o2], &[r0, r1, r2]))
    }

    /// Same as [`CalibrationValidator::check`] for triangles known to have three points.
    pub fn compare(&self, origin: &[DVec2; 3], reference: &[DVec2; 3]) -> ValidationReport {
        let origin_ratios = triangle_ratios(origin, self.origin_metric);
        let reference_ratios = triangle_ratios(reference, TriangleMetric::Geodesic);

        let accepted = (1..3).all(|i| {
            let (lo, hi) = (
                origin_ratios[i] - self.tolerance,
                origin_ratios[i] + self.tolerance,
            );
            reference_ratios[i] >= lo && reference_ratios[i] <= hi
        });

        ValidationReport {
            origin_ratios,
            reference_ratios,
            accepted,
        }
    }

    /// Whether the calibration is plausible. Wrongly sized triangles are rejected.
    pub fn is_valid(&self, origin: &[DVec2], reference: &[DVec2]) -> bool {
        self.check(origin, reference)
            .map(|report| report.accepted)
            .unwrap_or(false)
    }
}
