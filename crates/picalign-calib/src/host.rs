use glam::{DAffine2, DVec2};
use picalign_geometry::{invert_affine, GeometryError, PictureTransform};
use serde::{Deserialize, Serialize};

/// Radius of the sphere used by the Web-Mercator projection, in meters.
pub const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Conversion between geographic coordinates and view pixels.
pub trait MapView {
    /// Maps `(longitude, latitude)` in degrees to a view position in pixels.
    fn geo_to_view(&self, lon_lat: DVec2) -> DVec2;

    /// Maps a view position in pixels to `(longitude, latitude)` in degrees.
    fn view_to_geo(&self, view: DVec2) -> DVec2;
}

impl<V: MapView + ?Sized> MapView for &V {
    fn geo_to_view(&self, lon_lat: DVec2) -> DVec2 {
        (**self).geo_to_view(lon_lat)
    }

    fn view_to_geo(&self, view: DVec2) -> DVec2 {
        (**self).view_to_geo(view)
    }
}

/// A spherical Web-Mercator map view.
///
/// The view is centered on `center`, `y` grows downward and one pixel covers
/// `meters_per_pixel` projected meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MercatorView {
    /// View center as `(longitude, latitude)` in degrees.
    pub center: DVec2,
    /// Projected meters covered by one pixel.
    pub meters_per_pixel: f64,
    /// Viewport size in pixels.
    pub size: DVec2,
}

impl MercatorView {
    /// Creates a view.
    pub fn new(center: DVec2, meters_per_pixel: f64, size: DVec2) -> Self {
        Self {
            center,
            meters_per_pixel,
            size,
        }
    }

    /// Projects `(longitude, latitude)` in degrees to Mercator `(east, north)` meters.
    pub fn project(lon_lat: DVec2) -> DVec2 {
        let lambda = lon_lat.x.to_radians();
        let phi = lon_lat.y.to_radians();
        DVec2::new(
            MERCATOR_RADIUS * lambda,
            MERCATOR_RADIUS * (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln(),
        )
    }

    /// Inverse of [`MercatorView::project`].
    pub fn unproject(east_north: DVec2) -> DVec2 {
        let lambda = east_north.x / MERCATOR_RADIUS;
        let phi =
            2.0 * (east_north.y / MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2;
        DVec2::new(lambda.to_degrees(), phi.to_degrees())
    }
}

impl MapView for MercatorView {
    fn geo_to_view(&self, lon_lat: DVec2) -> DVec2 {
        let en = Self::project(lon_lat);
        let center = Self::project(self.center);
        DVec2::new(
            (en.x - center.x) / self.meters_per_pixel + self.size.x / 2.0,
            (center.y - en.y) / self.meters_per_pixel + self.size.y / 2.0,
        )
    }

    fn view_to_geo(&self, view: DVec2) -> DVec2 {
        let center = Self::project(self.center);
        let en = DVec2::new(
            center.x + (view.x - self.size.x / 2.0) * self.meters_per_pixel,
            center.y - (view.y - self.size.y / 2.0) * self.meters_per_pixel,
        );
        Self::unproject(en)
    }
}

/// A picture layer that can be calibrated.
pub trait PictureLayer {
    /// The layer's picture transform.
    fn transform(&self) -> &PictureTransform;

    /// Mutable access to the layer's picture transform.
    fn transform_mut(&mut self) -> &mut PictureTransform;

    /// Maps a view position to the layer's working space.
    fn view_to_working(&self, view: DVec2) -> Result<DVec2, GeometryError>;

    /// Maps a working space position to the view.
    fn working_to_view(&self, working: DVec2) -> DVec2;

    /// Notifies the host that the layer must be redrawn.
    fn invalidate(&mut self) {}
}

impl<L: PictureLayer + ?Sized> PictureLayer for &mut L {
    fn transform(&self) -> &PictureTransform {
        (**self).transform()
    }

    fn transform_mut(&mut self) -> &mut PictureTransform {
        (**self).transform_mut()
    }

    fn view_to_working(&self, view: DVec2) -> Result<DVec2, GeometryError> {
        (**self).view_to_working(view)
    }

    fn working_to_view(&self, working: DVec2) -> DVec2 {
        (**self).working_to_view(working)
    }

    fn invalidate(&mut self) {
        (**self).invalidate()
    }
}

/// A picture placed in the view by an affine map from working space to view pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPicture {
    transform: PictureTransform,
    placement: DAffine2,
    redraws: usize,
}

impl PlacedPicture {
    /// Creates a layer with an identity picture transform.
    pub fn new(placement: DAffine2) -> Self {
        Self {
            transform: PictureTransform::new(),
            placement,
            redraws: 0,
        }
    }

    /// Creates a layer whose working space origin sits at `position` in the view, scaled
    /// uniformly by `scale` view pixels per working unit.
    pub fn at(position: DVec2, scale: f64) -> Self {
        Self::new(DAffine2::from_scale_angle_translation(
            DVec2::splat(scale),
            0.0,
            position,
        ))
    }

    /// The working space to view map.
    pub fn placement(&self) -> DAffine2 {
        self.placement
    }

    /// Replaces the working space to view map.
    pub fn set_placement(&mut self, placement: DAffine2) {
        self.placement = placement;
        self.redraws += 1;
    }

    /// Number of redraw requests received so far.
    pub fn redraw_count(&self) -> usize {
        self.redraws
    }
}

impl PictureLayer for PlacedPicture {
    fn transform(&self) -> &PictureTransform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut PictureTransform {
        &mut self.transform
    }

    fn view_to_working(&self, view: DVec2) -> Result<DVec2, GeometryError> {
        Ok(invert_affine(&self.placement)?.transform_point2(view))
    }

    fn working_to_view(&self, working: DVec2) -> DVec2 {
        self.placement.transform_point2(working)
    }

    fn invalidate(&mut self) {
        self.redraws += 1;
    }
}

/// Lookup of existing geographic points, used to snap reference points onto known data.
pub trait PointQuery {
    /// The point closest to `lon_lat`, if any.
    fn nearest_point(&self, lon_lat: DVec2) -> Option<DVec2>;
}

/// The point of `points` closest to `target` within `max_distance`.
///
/// Distances are planar in degrees, which is enough to pick the clicked node.
pub fn nearest_point(points: &[DVec2], target: DVec2, max_distance: f64) -> Option<DVec2> {
    points
        .iter()
        .map(|p| (*p, p.distance(target)))
        .filter(|(_, d)| *d <= max_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| p)
}

impl PointQuery for [DVec2] {
    fn nearest_point(&self, lon_lat: DVec2) -> Option<DVec2> {
        nearest_point(self, lon_lat, f64::INFINITY)
    }
}

impl PointQuery for Vec<DVec2> {
    fn nearest_point(&self, lon_lat: DVec2) -> Option<DVec2> {
        self.as_slice().nearest_point(lon_lat)
    }
}

/// Points searched within a fixed radius.
///
/// Slices and vectors search without a limit; wrap them to ignore points far from the click.
#[derive(Debug, Clone, Copy)]
pub struct NearbyPoints<'a> {
    points: &'a [DVec2],
    max_distance: f64,
}

impl<'a> NearbyPoints<'a> {
    /// Searches `points` within `max_distance` degrees.
    pub fn new(points: &'a [DVec2], max_distance: f64) -> Self {
        Self {
            points,
            max_distance,
        }
    }

    /// The search radius in degrees.
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }
}

impl PointQuery for NearbyPoints<'_> {
    fn nearest_point(&self, lon_lat: DVec2) -> Option<DVec2> {
        nearest_point(self.points, lon_lat, self.max_distance)
    }
}
