use serde::{Deserialize, Serialize};

/// How side lengths of the origin triangle are measured by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriangleMetric {
    /// Euclidean distance in the units of the points (pixels or working units).
    #[default]
    Planar,
    /// Haversine distance between the map positions of the origin points.
    ///
    /// Each origin point is placed through the layer's current transform and the map view, and
    /// the resulting `(longitude, latitude)` triangle is compared with the reference triangle.
    Geodesic,
}

/// Configuration of the calibration engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Absolute tolerance on the normalized side ratios of the two triangles.
    pub ratio_tolerance: f64,
    /// Metric used for the origin triangle. The reference triangle is always geodesic.
    pub origin_metric: TriangleMetric,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            ratio_tolerance: 0.5,
            origin_metric: TriangleMetric::Planar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_json() -> Result<(), serde_json::Error> {
        let config: CalibrationConfig = serde_json::from_str("{}")?;
        assert_eq!(config, CalibrationConfig::default());
        Ok(())
    }

    #[test]
    fn test_config_from_json() -> Result<(), serde_json::Error> {
        let config: CalibrationConfig =
            serde_json::from_str(r#"{"ratio_tolerance": 0.25, "origin_metric": "geodesic"}"#)?;
        assert_eq!(config.ratio_tolerance, 0.25);
        assert_eq!(config.origin_metric, TriangleMetric::Geodesic);
        Ok(())
    }
}
