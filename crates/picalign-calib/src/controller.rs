use std::sync::mpsc::{self, Receiver, Sender};

use glam::DVec2;
use picalign_geometry::GeoLine;
use serde::Serialize;

use crate::config::{CalibrationConfig, TriangleMetric};
use crate::corrector::correct_reference_points;
use crate::error::{CalibrationError, CorrectionError, PreconditionError};
use crate::host::{MapView, PictureLayer, PointQuery};
use crate::point_list::{PointList, SizeChange};
use crate::validator::{CalibrationValidator, ValidationReport};

/// Number of points per role needed for a calibration.
pub const POINTS_PER_ROLE: usize = 3;

/// Progress of a calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    /// No layer is being calibrated.
    Idle,
    /// Points or distances are still missing.
    CollectingPoints,
    /// All inputs are present, [`AutoCalibration::calibrate`] can run.
    Ready,
    /// The transform is being updated.
    Calibrating,
    /// The last attempt was accepted and the transform keeps the new correspondences.
    Accepted,
    /// The last attempt was rejected and the transform was reset.
    Rejected,
}

/// Which point list an event comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointRole {
    /// Points picked on the picture.
    Origin,
    /// Geographic points the origin points are mapped to.
    Reference,
}

/// A point list of the session changed its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointListEvent {
    /// The list that changed.
    pub role: PointRole,
    /// Lengths before and after the change.
    pub change: SizeChange,
}

/// Transient inputs of one calibration attempt.
#[derive(Debug, Default)]
pub struct CalibrationSession {
    origin_points: PointList,
    reference_points: PointList,
    distance_01: f64,
    distance_12: f64,
}

impl CalibrationSession {
    /// Origin points in picture coordinates, in picking order.
    pub fn origin_points(&self) -> &[DVec2] {
        self.origin_points.as_slice()
    }

    /// Reference points as `(longitude, latitude)`, in picking order.
    pub fn reference_points(&self) -> &[DVec2] {
        self.reference_points.as_slice()
    }

    /// Distance in meters between the first and second reference point. Zero when unset.
    pub fn distance_01(&self) -> f64 {
        self.distance_01
    }

    /// Distance in meters between the second and third reference point. Zero when unset.
    pub fn distance_12(&self) -> f64 {
        self.distance_12
    }

    /// Whether all points and both distances are present.
    pub fn is_complete(&self) -> bool {
        self.origin_points.len() == POINTS_PER_ROLE
            && self.reference_points.len() == POINTS_PER_ROLE
            && self.distance_01 != 0.0
            && self.distance_12 != 0.0
    }

    fn clear(&mut self) {
        self.origin_points.clear();
        self.reference_points.clear();
        self.origin_points.clear_listeners();
        self.reference_points.clear_listeners();
        self.distance_01 = 0.0;
        self.distance_12 = 0.0;
    }
}

/// Result of an accepted calibration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Reference points after distance correction.
    pub corrected_points: [DVec2; 3],
    /// Working space position of each corrected point. `None` when the point was skipped
    /// because the layer could not convert it.
    pub working_targets: Vec<Option<DVec2>>,
    /// Side ratios compared by the validator.
    pub validation: ValidationReport,
}

/// Outcome categories presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationOutcome {
    /// The picture was calibrated.
    Accepted,
    /// The calibration did not run.
    PreconditionFailed,
    /// The calibration would distort the picture and was rolled back.
    DimensionMismatch,
}

impl CalibrationOutcome {
    /// Classifies the result of [`AutoCalibration::calibrate`].
    pub fn of(result: &Result<CalibrationReport, CalibrationError>) -> Self {
        match result {
            Ok(_) => Self::Accepted,
            Err(CalibrationError::DimensionMismatch { .. }) => Self::DimensionMismatch,
            Err(CalibrationError::PreconditionFailed(_) | CalibrationError::Geometry(_)) => {
                Self::PreconditionFailed
            }
        }
    }
}

/// Parses a distance in meters typed by the user.
///
/// Both `.` and `,` are accepted as decimal separator.
pub fn parse_distance(text: &str) -> Result<f64, PreconditionError> {
    let invalid = || PreconditionError::InvalidDistanceText(text.to_string());
    let value = text
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(value)
}

/// Three-point calibration of a picture layer.
///
/// The controller owns the layer while a session runs. Origin points are picked on the picture,
/// reference points on the map, and [`AutoCalibration::calibrate`] moves the picture so the
/// origin points land on the distance-corrected reference points.
///
/// # Example
///
/// ```
/// use picalign_calib::{
///     AutoCalibration, CalibrationConfig, CalibrationState, MercatorView, PlacedPicture,
/// };
/// use picalign_geometry::DVec2;
///
/// let view = MercatorView::new(DVec2::ZERO, 1.0, DVec2::ZERO);
/// let mut calibration = AutoCalibration::new(CalibrationConfig::default(), view);
/// calibration.start(PlacedPicture::at(DVec2::ZERO, 1.0));
///
/// for p in [DVec2::new(0.0, 0.0), DVec2::new(100.0, 0.0), DVec2::new(100.0, 100.0)] {
///     calibration.add_origin_point(p)?;
/// }
/// for p in [DVec2::new(0.0, 0.0), DVec2::new(0.001, 0.0), DVec2::new(0.001, 0.001)] {
///     calibration.add_reference_point(p)?;
/// }
/// calibration.set_distance_01(100.0)?;
/// calibration.set_distance_12(100.0)?;
/// assert_eq!(calibration.state(), CalibrationState::Ready);
///
/// let report = calibration.calibrate()?;
/// assert!(report.validation.accepted);
/// # Ok::<(), picalign_calib::error::CalibrationError>(())
/// ```
pub struct AutoCalibration<L: PictureLayer, V: MapView> {
    config: CalibrationConfig,
    validator: CalibrationValidator,
    view: V,
    layer: Option<L>,
    state: CalibrationState,
    session: CalibrationSession,
    events_tx: Sender<PointListEvent>,
    events_rx: Receiver<PointListEvent>,
    // whether each list last reported three points
    origin_full: bool,
    reference_full: bool,
}

impl<L: PictureLayer, V: MapView> AutoCalibration<L, V> {
    /// Creates an idle controller.
    pub fn new(config: CalibrationConfig, view: V) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            validator: CalibrationValidator::new(&config),
            config,
            view,
            layer: None,
            state: CalibrationState::Idle,
            session: CalibrationSession::default(),
            events_tx,
            events_rx,
            origin_full: false,
            reference_full: false,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Points and distances collected so far.
    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    /// The map view used for coordinate conversion.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The layer being calibrated.
    pub fn layer(&self) -> Option<&L> {
        self.layer.as_ref()
    }

    /// Mutable access to the layer being calibrated.
    pub fn layer_mut(&mut self) -> Option<&mut L> {
        self.layer.as_mut()
    }

    /// Starts a session on `layer`.
    ///
    /// A layer that already holds exactly three origin points keeps them and they become the
    /// session's origin points. Any other layer is reset to the identity map. A running session
    /// is cancelled first and its layer returned.
    pub fn start(&mut self, mut layer: L) -> Option<L> {
        let previous = self.cancel();

        for (role, list) in [
            (PointRole::Origin, &mut self.session.origin_points),
            (PointRole::Reference, &mut self.session.reference_points),
        ] {
            let tx = self.events_tx.clone();
            list.subscribe(move |change| {
                // the receiver lives as long as the controller
                let _ = tx.send(PointListEvent { role, change });
            });
        }

        let existing = layer.transform().origin_points();
        if existing.len() == POINTS_PER_ROLE {
            log::debug!("adopting origin points {existing:?}");
            self.session.origin_points.extend(existing);
        } else {
            layer.transform_mut().reset_calibration();
            layer.invalidate();
        }

        self.layer = Some(layer);
        self.state = CalibrationState::CollectingPoints;
        log::info!("calibration session started");
        self.refresh_state();
        previous
    }

    /// Ends the session and hands the layer back.
    ///
    /// Points and distances are discarded; the layer's transform is left as is.
    pub fn cancel(&mut self) -> Option<L> {
        self.session.clear();
        while self.events_rx.try_recv().is_ok() {}
        self.origin_full = false;
        self.reference_full = false;
        if self.state != CalibrationState::Idle {
            log::info!("calibration session cancelled");
        }
        self.state = CalibrationState::Idle;
        self.layer.take()
    }

    /// Adds an origin point in picture coordinates.
    pub fn add_origin_point(&mut self, point: DVec2) -> Result<(), CalibrationError> {
        let layer = self.layer.as_mut().ok_or(PreconditionError::MissingLayer)?;
        let origin = &mut self.session.origin_points;
        if origin.len() >= POINTS_PER_ROLE {
            return Err(PreconditionError::PointListFull(origin.len()).into());
        }

        layer.transform_mut().add_origin_point(point);
        layer.invalidate();
        origin.push(point);
        self.refresh_state();
        Ok(())
    }

    /// Adds the origin point under a view position and returns it in picture coordinates.
    pub fn add_origin_point_at_view(&mut self, view: DVec2) -> Result<DVec2, CalibrationError> {
        let point = self.picture_point_at_view(view)?;
        self.add_origin_point(point)?;
        Ok(point)
    }

    /// Moves an origin point. The picture does not move.
    ///
    /// Returns `false` and changes nothing if `old` is not an origin point of the session.
    pub fn move_origin_point(
        &mut self,
        old: DVec2,
        new: DVec2,
    ) -> Result<bool, CalibrationError> {
        let layer = self.layer.as_mut().ok_or(PreconditionError::MissingLayer)?;
        if !self.session.origin_points.as_slice().contains(&old) {
            log::debug!("{old:?} is not an origin point of the session");
            return Ok(false);
        }
        layer.transform_mut().replace_origin_point(old, new)?;
        layer.invalidate();
        self.session.origin_points.replace_item(&old, new);
        self.refresh_state();
        Ok(true)
    }

    /// Removes an origin point. Returns `false` if it was not an origin point of the session.
    pub fn remove_origin_point(&mut self, point: DVec2) -> Result<bool, CalibrationError> {
        let layer = self.layer.as_mut().ok_or(PreconditionError::MissingLayer)?;
        if !self.session.origin_points.remove_item(&point) {
            return Ok(false);
        }
        layer.transform_mut().remove_origin_point(point);
        layer.invalidate();
        self.refresh_state();
        Ok(true)
    }

    /// Adds a reference point as `(longitude, latitude)`.
    pub fn add_reference_point(&mut self, lon_lat: DVec2) -> Result<(), CalibrationError> {
        if self.layer.is_none() {
            return Err(PreconditionError::MissingLayer.into());
        }
        let reference = &mut self.session.reference_points;
        if reference.len() >= POINTS_PER_ROLE {
            return Err(PreconditionError::PointListFull(reference.len()).into());
        }
        reference.push(lon_lat);
        self.refresh_state();
        Ok(())
    }

    /// Adds the existing point nearest to a click as reference point and returns it.
    pub fn add_reference_point_nearest<Q>(
        &mut self,
        click_view: DVec2,
        points: &Q,
    ) -> Result<DVec2, CalibrationError>
    where
        Q: PointQuery + ?Sized,
    {
        let clicked = self.view.view_to_geo(click_view);
        let point = points
            .nearest_point(clicked)
            .ok_or(PreconditionError::NoNearbyPoint(clicked.x, clicked.y))?;
        self.add_reference_point(point)?;
        Ok(point)
    }

    /// Adds a reference point guided by the entered distances and returns it.
    ///
    /// The first point is placed under the cursor. The second lies `distance_01` meters from the
    /// first towards the cursor, the third `distance_12` meters from the second towards the
    /// cursor.
    pub fn add_reference_point_guided(
        &mut self,
        cursor_view: DVec2,
    ) -> Result<DVec2, CalibrationError> {
        let point = self.guided_point(cursor_view)?;
        self.add_reference_point(point)?;
        Ok(point)
    }

    /// Segment from the last reference point to where the next guided point would be placed,
    /// in view coordinates.
    ///
    /// `None` while there is nothing to guide from. Without the matching distance the segment
    /// ends at the cursor.
    pub fn guide_segment(&self, cursor_view: DVec2) -> Option<[DVec2; 2]> {
        let reference = self.session.reference_points.as_slice();
        let last = match reference.len() {
            1 | 2 => reference[reference.len() - 1],
            _ => return None,
        };
        let end = match self.guided_point(cursor_view) {
            Ok(point) => self.view.geo_to_view(point),
            Err(_) => cursor_view,
        };
        Some([self.view.geo_to_view(last), end])
    }

    /// Sets the distance in meters between the first and second reference point.
    pub fn set_distance_01(&mut self, meters: f64) -> Result<(), CalibrationError> {
        self.session.distance_01 = Self::checked_distance(meters)?;
        self.refresh_state();
        Ok(())
    }

    /// Sets the distance in meters between the second and third reference point.
    pub fn set_distance_12(&mut self, meters: f64) -> Result<(), CalibrationError> {
        self.session.distance_12 = Self::checked_distance(meters)?;
        self.refresh_state();
        Ok(())
    }

    /// Runs the calibration.
    ///
    /// The reference points are corrected to the entered distances, converted to the layer's
    /// working space and paired with the origin points of the same index. The picture's origin
    /// triangle is then compared with the corrected reference triangle. With
    /// [`TriangleMetric::Geodesic`] the origin triangle is measured between the map positions
    /// the origin points had before the transform was updated.
    ///
    /// # Errors
    ///
    /// * [`CalibrationError::PreconditionFailed`] when inputs are missing or degenerate. Nothing
    ///   is changed.
    /// * [`CalibrationError::DimensionMismatch`] when the triangles do not match. The transform
    ///   is reset to the identity map and the origin points are pinned again, so the attempt can
    ///   be retried.
    pub fn calibrate(&mut self) -> Result<CalibrationReport, CalibrationError> {
        self.refresh_state();
        let (origin, corrected) = match self.prepare() {
            Ok(inputs) => inputs,
            Err(err) => {
                log::debug!("calibration not started: {err}");
                if self.state != CalibrationState::Idle {
                    self.state = CalibrationState::CollectingPoints;
                }
                return Err(err.into());
            }
        };

        self.state = CalibrationState::Calibrating;
        let Some(layer) = self.layer.as_mut() else {
            return Err(PreconditionError::MissingLayer.into());
        };

        let measured_origin = match self.config.origin_metric {
            TriangleMetric::Planar => origin,
            TriangleMetric::Geodesic => {
                let view = &self.view;
                let transform = layer.transform();
                origin.map(|p| {
                    view.view_to_geo(layer.working_to_view(transform.transform_point(p)))
                })
            }
        };

        let mut working_targets = Vec::with_capacity(POINTS_PER_ROLE);
        for (source, target) in origin.iter().zip(corrected.iter()) {
            let working = match layer.view_to_working(self.view.geo_to_view(*target)) {
                Ok(working) => working,
                Err(err) => {
                    log::warn!("skipping reference point {target:?}: {err}");
                    working_targets.push(None);
                    continue;
                }
            };
            if let Err(err) = layer.transform_mut().update_pair(*source, working) {
                Self::rollback(layer, &origin);
                self.state = CalibrationState::CollectingPoints;
                return Err(err.into());
            }
            working_targets.push(Some(working));
        }
        layer.invalidate();

        let validation = self.validator.compare(&measured_origin, &corrected);
        if !validation.accepted {
            log::warn!(
                "calibration rejected, side ratios {:?} vs {:?}",
                validation.origin_ratios,
                validation.reference_ratios
            );
            Self::rollback(layer, &origin);
            self.state = CalibrationState::Rejected;
            return Err(CalibrationError::DimensionMismatch {
                origin: validation.origin_ratios,
                reference: validation.reference_ratios,
            });
        }

        log::info!("calibration accepted: {:?}", layer.transform().matrix());
        self.state = CalibrationState::Accepted;
        Ok(CalibrationReport {
            corrected_points: corrected,
            working_targets,
            validation,
        })
    }

    /// Undoes an accepted calibration the user declined.
    ///
    /// Returns `false` unless the last attempt was accepted.
    pub fn revert_calibration(&mut self) -> bool {
        if self.state != CalibrationState::Accepted {
            return false;
        }
        let Some(layer) = self.layer.as_mut() else {
            return false;
        };
        Self::rollback(layer, self.session.origin_points.as_slice());
        log::info!("calibration reverted");
        self.state = CalibrationState::CollectingPoints;
        self.refresh_state();
        true
    }

    fn prepare(&self) -> Result<([DVec2; 3], [DVec2; 3]), PreconditionError> {
        if self.layer.is_none() {
            return Err(PreconditionError::MissingLayer);
        }
        let &[o0, o1, o2] = self.session.origin_points() else {
            return Err(PreconditionError::OriginPointCount(
                self.session.origin_points.len(),
            ));
        };
        let reference = self.session.reference_points();
        if reference.len() != POINTS_PER_ROLE {
            return Err(PreconditionError::ReferencePointCount(reference.len()));
        }
        if self.session.distance_01 == 0.0 || self.session.distance_12 == 0.0 {
            return Err(PreconditionError::ZeroDistance);
        }

        let corrected = correct_reference_points(
            reference,
            self.session.distance_01,
            self.session.distance_12,
        )?;
        Ok(([o0, o1, o2], corrected))
    }

    fn guided_point(&self, cursor_view: DVec2) -> Result<DVec2, CalibrationError> {
        if self.layer.is_none() {
            return Err(PreconditionError::MissingLayer.into());
        }
        let cursor = self.view.view_to_geo(cursor_view);
        let reference = self.session.reference_points.as_slice();
        let (from, distance, segment) = match reference.len() {
            0 => return Ok(cursor),
            1 => (reference[0], self.session.distance_01, (0, 1)),
            2 => (reference[1], self.session.distance_12, (1, 2)),
            n => return Err(PreconditionError::PointListFull(n).into()),
        };
        if distance == 0.0 {
            return Err(PreconditionError::MissingDistance.into());
        }
        GeoLine::new(from, cursor)
            .try_point_on_line(distance)
            .ok_or_else(|| {
                PreconditionError::from(CorrectionError::CoincidentPoints(segment.0, segment.1))
                    .into()
            })
    }

    fn picture_point_at_view(&self, view: DVec2) -> Result<DVec2, CalibrationError> {
        let layer = self.layer.as_ref().ok_or(PreconditionError::MissingLayer)?;
        let working = layer.view_to_working(view)?;
        Ok(layer.transform().inverse_transform_point(working)?)
    }

    fn checked_distance(meters: f64) -> Result<f64, PreconditionError> {
        if !meters.is_finite() || meters < 0.0 {
            return Err(CorrectionError::InvalidDistance(meters).into());
        }
        Ok(meters)
    }

    // identity map with the origin points pinned in place
    fn rollback(layer: &mut L, origin: &[DVec2]) {
        let transform = layer.transform_mut();
        transform.reset_calibration();
        for point in origin {
            transform.add_origin_point(*point);
        }
        layer.invalidate();
    }

    fn refresh_state(&mut self) {
        for PointListEvent { role, change } in self.events_rx.try_iter() {
            log::debug!("{role:?} points: {} -> {}", change.old_len, change.new_len);
            let full = change.new_len == POINTS_PER_ROLE;
            if full {
                log::debug!("all {role:?} points collected");
            }
            match role {
                PointRole::Origin => self.origin_full = full,
                PointRole::Reference => self.reference_full = full,
            }
        }

        let distances_set = self.session.distance_01 != 0.0 && self.session.distance_12 != 0.0;
        self.state = match self.state {
            CalibrationState::Idle | CalibrationState::Calibrating => self.state,
            _ if self.origin_full && self.reference_full && distances_set => {
                CalibrationState::Ready
            }
            _ => CalibrationState::CollectingPoints,
        };
    }
}
