//! Slippy-map camera (center, zoom, pitch, bearing) on top of the engine's
//! ECEF camera. The engine camera is authoritative: getters re-read it so
//! that manual navigation shows up.

use foundation::math::{
    GeoPoint, cartesian_from_degrees, cartographic_from_cartesian, clamp_zoom, height_to_zoom,
    zoom_to_height,
};
use scene::{CameraView, GlobeEngine};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub center: GeoPoint,
    pub zoom: f64,
    /// Degrees down from the horizon; 90 looks straight down.
    pub pitch_deg: f64,
    /// Degrees clockwise from north.
    pub bearing_deg: f64,
}

#[derive(Debug, Clone)]
pub struct CameraController {
    pose: CameraPose,
    /// Engine camera as last set from here; any difference means the user
    /// navigated since.
    applied: Option<CameraView>,
}

impl CameraController {
    pub fn new(mut pose: CameraPose) -> Self {
        pose.zoom = clamp_zoom(pose.zoom);
        Self { pose, applied: None }
    }

    /// Last known pose, without consulting the engine.
    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Engine camera that realizes the current pose.
    pub fn view<E: GlobeEngine + ?Sized>(&self, engine: &E) -> CameraView {
        let p = self.pose;
        let height = zoom_to_height(p.zoom, p.center.lat_deg, engine.viewport().height_hint());
        CameraView {
            position: cartesian_from_degrees(p.center.lon_deg, p.center.lat_deg, height),
            heading_rad: p.bearing_deg.to_radians(),
            pitch_rad: (-p.pitch_deg).to_radians(),
            roll_rad: 0.0,
        }
    }

    pub fn apply<E: GlobeEngine + ?Sized>(&mut self, engine: &mut E) {
        let view = self.view(engine);
        engine.set_view(view);
        self.applied = Some(view);
    }

    pub fn set_center<E: GlobeEngine + ?Sized>(&mut self, engine: &mut E, center: GeoPoint) {
        self.sync(engine);
        self.pose.center = center;
        self.apply(engine);
    }

    pub fn set_zoom<E: GlobeEngine + ?Sized>(&mut self, engine: &mut E, zoom: f64) {
        self.sync(engine);
        self.pose.zoom = clamp_zoom(zoom);
        self.apply(engine);
    }

    /// Picks up manual navigation before a setter rebuilds the view. A camera
    /// that still matches the last applied view is left alone so repeated
    /// setters do not drift through the center ray-cast.
    fn sync<E: GlobeEngine + ?Sized>(&mut self, engine: &E) {
        if self.applied.is_some_and(|view| view != engine.camera()) {
            self.refresh(engine);
        }
    }

    /// Re-derives the pose from the engine camera. The center is where the
    /// ray through the middle of the viewport meets the ellipsoid; when it
    /// misses (looking at the sky) the previous center is kept.
    pub fn refresh<E: GlobeEngine + ?Sized>(&mut self, engine: &E) -> CameraPose {
        let viewport = engine.viewport();
        if let Some(hit) = engine.pick_ellipsoid(viewport.center()) {
            let (center, _) = cartographic_from_cartesian(hit);
            self.pose.center = center;
        }

        let camera = engine.camera();
        let (_, height) = cartographic_from_cartesian(camera.position);
        if height.is_finite() {
            self.pose.zoom = height_to_zoom(height, self.pose.center.lat_deg, viewport.height_hint());
        }
        self.pose.bearing_deg = camera.heading_rad.to_degrees();
        self.pose.pitch_deg = -camera.pitch_rad.to_degrees();
        tracing::trace!(pose = ?self.pose, "camera refreshed");
        self.pose
    }
}
