use glam::DVec2;

/// Mean radius of the Earth in meters.
pub const EARTH_MEAN_RADIUS: f64 = 6_371_008.8;

/// Great-circle distance between two geographic points using the Haversine formula.
///
/// # Arguments
///
/// * `a` - The first point as `(longitude, latitude)` in degrees.
/// * `b` - The second point as `(longitude, latitude)` in degrees.
///
/// # Returns
///
/// The distance in meters on a sphere of radius [`EARTH_MEAN_RADIUS`].
///
/// # Example
///
/// ```
/// use picalign_geometry::{haversine_distance, DVec2};
///
/// let d = haversine_distance(DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0));
/// assert!((d - 111_195.08).abs() < 0.01);
/// ```
pub fn haversine_distance(a: DVec2, b: DVec2) -> f64 {
    let phi1 = a.y.to_radians();
    let phi2 = b.y.to_radians();
    let delta_phi = (b.y - a.y).to_radians();
    let delta_lambda = (b.x - a.x).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_MEAN_RADIUS * c
}

/// A segment between two geographic points.
///
/// The geodesic length is computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLine {
    start: DVec2,
    end: DVec2,
    distance: f64,
}

impl GeoLine {
    /// Creates a segment from two `(longitude, latitude)` points in degrees.
    pub fn new(start: DVec2, end: DVec2) -> Self {
        Self {
            start,
            end,
            distance: haversine_distance(start, end),
        }
    }

    /// Creates a segment from explicit latitudes and longitudes in degrees.
    pub fn from_lat_lon(start_lat: f64, start_lon: f64, end_lat: f64, end_lon: f64) -> Self {
        Self::new(
            DVec2::new(start_lon, start_lat),
            DVec2::new(end_lon, end_lat),
        )
    }

    /// The start point as `(longitude, latitude)`.
    pub fn start(&self) -> DVec2 {
        self.start
    }

    /// The end point as `(longitude, latitude)`.
    pub fn end(&self) -> DVec2 {
        self.end
    }

    /// Geodesic length of the segment in meters.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Returns the point at `distance_from_start` meters from the start towards the end.
    ///
    /// Latitude and longitude are interpolated independently by the fraction
    /// `distance_from_start / distance()`. This is not a geodesic interpolation and is only
    /// accurate for short segments, but it is the rule every caller in this workspace relies on.
    ///
    /// PRECONDITION: the segment has a non-zero length. A zero-length segment yields non-finite
    /// coordinates; use [`GeoLine::try_point_on_line`] when the length is not known to be positive.
    pub fn point_on_line(&self, distance_from_start: f64) -> DVec2 {
        let fraction = distance_from_start / self.distance;
        let lat = self.start.y + (self.end.y - self.start.y) * fraction;
        let lon = self.start.x + (self.end.x - self.start.x) * fraction;
        DVec2::new(lon, lat)
    }

    /// Same as [`GeoLine::point_on_line`], returning `None` for a zero-length segment.
    pub fn try_point_on_line(&self, distance_from_start: f64) -> Option<DVec2> {
        if self.distance > 0.0 {
            Some(self.point_on_line(distance_from_start))
        } else {
            None
        }
    }
}
