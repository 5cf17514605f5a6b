use foundation::math::{Vec2, Vec3};

use crate::color::Color;
use crate::primitive::{GroupId, Primitive};
use crate::structure::{FeatureRef, StructureDataset};

/// Canvas size in CSS pixels. Zero means the host could not measure it.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Viewport {
    pub width_px: f64,
    pub height_px: f64,
}

impl Viewport {
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width_px / 2.0, self.height_px / 2.0)
    }

    /// Height for zoom conversions, `None` when unknown.
    pub fn height_hint(&self) -> Option<f64> {
        (self.height_px.is_finite() && self.height_px > 0.0).then_some(self.height_px)
    }
}

/// Native engine camera pose: ECEF position plus heading/pitch/roll in radians.
///
/// Heading is clockwise from north; negative pitch looks below the horizon.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub heading_rad: f64,
    pub pitch_rad: f64,
    pub roll_rad: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PickedObject {
    /// A feature of the streamed structure dataset.
    Structure(FeatureRef),
    /// A primitive drawn into one of the caller-created groups.
    Primitive(GroupId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSetup {
    pub imagery_url: String,
    pub background: Color,
    pub show_sky_box: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRequest {
    pub url: String,
    pub maximum_screen_space_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawError {
    UnknownGroup(GroupId),
    DegenerateGeometry { vertices: usize },
    Resource(String),
}

impl std::fmt::Display for DrawError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawError::UnknownGroup(g) => write!(f, "unknown drawable group {}", g.0),
            DrawError::DegenerateGeometry { vertices } => {
                write!(f, "degenerate geometry with {vertices} vertices")
            }
            DrawError::Resource(msg) => write!(f, "resource failed to load: {msg}"),
        }
    }
}

impl std::error::Error for DrawError {}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetLoadError {
    Network(String),
    Format(String),
}

impl std::fmt::Display for DatasetLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetLoadError::Network(msg) => write!(f, "dataset request failed: {msg}"),
            DatasetLoadError::Format(msg) => write!(f, "dataset is malformed: {msg}"),
        }
    }
}

impl std::error::Error for DatasetLoadError {}

/// Imperative scene graph surface: named groups of primitives.
pub trait DrawTarget {
    fn create_group(&mut self, name: &str) -> GroupId;
    fn clear_group(&mut self, group: GroupId);
    fn add_primitive(&mut self, group: GroupId, primitive: Primitive) -> Result<(), DrawError>;
}

/// The 3D globe engine as seen from the compatibility layer.
///
/// Asynchronous results (dataset arrival, tile callbacks, camera settle,
/// clicks) are not pulled through this trait; the host forwards them to the
/// map object as they happen.
pub trait GlobeEngine: DrawTarget {
    type Dataset: StructureDataset;

    fn viewport(&self) -> Viewport;
    fn camera(&self) -> CameraView;
    fn set_view(&mut self, view: CameraView);
    /// Intersects the ray through a canvas pixel with the WGS84 ellipsoid.
    fn pick_ellipsoid(&self, screen: Vec2) -> Option<Vec3>;
    /// Every pickable object under a canvas pixel, front to back.
    fn drill_pick(&self, screen: Vec2, limit: usize) -> Vec<PickedObject>;
    fn resize(&mut self);
    fn configure_scene(&mut self, setup: &SceneSetup);
    /// Starts loading a tiled structure dataset; completion is reported later.
    fn request_structure_dataset(&mut self, request: &DatasetRequest);
}
