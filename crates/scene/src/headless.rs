//! In-process engine without a GPU: records primitives per group, keeps a
//! real camera with ellipsoid picking, and serves a tile store for the
//! structure dataset. Used by the CLI and by tests across the workspace.

use std::collections::BTreeMap;

use foundation::math::{Vec2, Vec3, cartesian_from_degrees};
use serde_json::{Map, Value};

use crate::color::Color;
use crate::engine::{
    CameraView, DatasetRequest, DrawError, DrawTarget, GlobeEngine, PickedObject, SceneSetup,
    Viewport,
};
use crate::picking::{pick_wgs84, screen_ray};
use crate::primitive::{GroupId, Primitive};
use crate::structure::{BaseStyle, StructureDataset, StructureFeature, StructureTile, TileId};

const DEFAULT_FOV_Y_RAD: f64 = std::f64::consts::FRAC_PI_3;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessGroup {
    pub name: String,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug)]
pub struct HeadlessEngine {
    viewport: Viewport,
    camera: CameraView,
    fov_y_rad: f64,
    groups: Vec<HeadlessGroup>,
    staged_picks: Vec<PickedObject>,
    scene_setup: Option<SceneSetup>,
    dataset_requests: Vec<DatasetRequest>,
    resize_count: usize,
}

impl HeadlessEngine {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            camera: CameraView {
                position: cartesian_from_degrees(0.0, 0.0, 10_000_000.0),
                heading_rad: 0.0,
                pitch_rad: -std::f64::consts::FRAC_PI_2,
                roll_rad: 0.0,
            },
            fov_y_rad: DEFAULT_FOV_Y_RAD,
            groups: Vec::new(),
            staged_picks: Vec::new(),
            scene_setup: None,
            dataset_requests: Vec::new(),
            resize_count: 0,
        }
    }

    pub fn group(&self, id: GroupId) -> Option<&HeadlessGroup> {
        self.groups.get(id.0 as usize)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&HeadlessGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn groups(&self) -> &[HeadlessGroup] {
        &self.groups
    }

    /// Results returned by the next drill picks, regardless of pixel.
    pub fn stage_picks(&mut self, picks: Vec<PickedObject>) {
        self.staged_picks = picks;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn scene_setup(&self) -> Option<&SceneSetup> {
        self.scene_setup.as_ref()
    }

    pub fn dataset_requests(&self) -> &[DatasetRequest] {
        &self.dataset_requests
    }

    pub fn resize_count(&self) -> usize {
        self.resize_count
    }
}

impl DrawTarget for HeadlessEngine {
    fn create_group(&mut self, name: &str) -> GroupId {
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(HeadlessGroup {
            name: name.to_string(),
            primitives: Vec::new(),
        });
        id
    }

    fn clear_group(&mut self, group: GroupId) {
        if let Some(g) = self.groups.get_mut(group.0 as usize) {
            g.primitives.clear();
        }
    }

    fn add_primitive(&mut self, group: GroupId, primitive: Primitive) -> Result<(), DrawError> {
        let min_vertices = match &primitive {
            Primitive::Polygon(_) => 3,
            Primitive::Polyline(_) => 2,
            Primitive::Point(_) | Primitive::Label(_) => 1,
        };
        let vertices = primitive.positions().len();
        if vertices < min_vertices {
            return Err(DrawError::DegenerateGeometry { vertices });
        }

        let g = self
            .groups
            .get_mut(group.0 as usize)
            .ok_or(DrawError::UnknownGroup(group))?;
        g.primitives.push(primitive);
        Ok(())
    }
}

impl GlobeEngine for HeadlessEngine {
    type Dataset = HeadlessDataset;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn camera(&self) -> CameraView {
        self.camera
    }

    fn set_view(&mut self, view: CameraView) {
        self.camera = view;
    }

    fn pick_ellipsoid(&self, screen: Vec2) -> Option<Vec3> {
        let ray = screen_ray(&self.camera, self.viewport, screen, self.fov_y_rad)?;
        pick_wgs84(ray)
    }

    fn drill_pick(&self, _screen: Vec2, limit: usize) -> Vec<PickedObject> {
        self.staged_picks.iter().take(limit).copied().collect()
    }

    fn resize(&mut self) {
        self.resize_count += 1;
    }

    fn configure_scene(&mut self, setup: &SceneSetup) {
        self.scene_setup = Some(setup.clone());
    }

    fn request_structure_dataset(&mut self, request: &DatasetRequest) {
        self.dataset_requests.push(request.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessFeature {
    pub properties: Map<String, Value>,
    pub feature_id: Option<u32>,
    pub content_url: Option<String>,
    pub show: bool,
    pub color: Option<Color>,
}

impl HeadlessFeature {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self {
            properties,
            feature_id: None,
            content_url: None,
            show: true,
            color: None,
        }
    }
}

impl StructureFeature for HeadlessFeature {
    fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    fn feature_id(&self) -> Option<u32> {
        self.feature_id
    }

    fn content_url(&self) -> Option<&str> {
        self.content_url.as_deref()
    }

    fn set_show(&mut self, show: bool) {
        self.show = show;
    }

    fn set_color(&mut self, color: Color) {
        self.color = Some(color);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessTile {
    pub content_url: String,
    pub features: Vec<HeadlessFeature>,
    pub silhouette: Option<(Color, f32)>,
}

impl HeadlessTile {
    /// Tile whose features are indexed in order, tagged with `content_url`.
    pub fn new(content_url: impl Into<String>, properties: Vec<Map<String, Value>>) -> Self {
        let content_url = content_url.into();
        let features = properties
            .into_iter()
            .enumerate()
            .map(|(i, props)| HeadlessFeature {
                feature_id: Some(i as u32),
                content_url: Some(content_url.clone()),
                ..HeadlessFeature::new(props)
            })
            .collect();
        Self {
            content_url,
            features,
            silhouette: None,
        }
    }
}

impl StructureTile for HeadlessTile {
    type Feature = HeadlessFeature;

    fn features_len(&self) -> usize {
        self.features.len()
    }

    fn feature_mut(&mut self, index: usize) -> Option<&mut HeadlessFeature> {
        self.features.get_mut(index)
    }

    fn set_silhouette(&mut self, color: Color, size: f32) {
        self.silhouette = Some((color, size));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessDataset {
    tiles: BTreeMap<TileId, HeadlessTile>,
    model_translation: Option<Vec3>,
    base_style: Option<BaseStyle>,
    style_dirty: bool,
}

impl HeadlessDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tile(&mut self, id: TileId, tile: HeadlessTile) {
        self.tiles.insert(id, tile);
    }

    pub fn remove_tile(&mut self, id: TileId) -> Option<HeadlessTile> {
        self.tiles.remove(&id)
    }

    pub fn tile(&self, id: TileId) -> Option<&HeadlessTile> {
        self.tiles.get(&id)
    }

    pub fn tile_ids(&self) -> Vec<TileId> {
        self.tiles.keys().copied().collect()
    }

    pub fn model_translation(&self) -> Option<Vec3> {
        self.model_translation
    }

    pub fn base_style(&self) -> Option<BaseStyle> {
        self.base_style
    }

    /// Returns whether the style was invalidated since the last call.
    pub fn take_style_dirty(&mut self) -> bool {
        std::mem::take(&mut self.style_dirty)
    }
}

impl StructureDataset for HeadlessDataset {
    type Tile = HeadlessTile;

    fn set_model_translation(&mut self, translation: Vec3) {
        self.model_translation = Some(translation);
    }

    fn set_base_style(&mut self, style: BaseStyle) {
        self.base_style = Some(style);
    }

    fn make_style_dirty(&mut self) {
        self.style_dirty = true;
    }

    fn tile_mut(&mut self, id: TileId) -> Option<&mut HeadlessTile> {
        self.tiles.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::{HeadlessDataset, HeadlessEngine, HeadlessTile};
    use crate::color::Color;
    use crate::engine::{DrawError, DrawTarget, GlobeEngine, Viewport};
    use crate::primitive::{PolygonPrimitive, Primitive};
    use crate::structure::{FeatureRef, StructureDataset, StructureFeature, TileId};
    use foundation::math::{Vec3, cartesian_from_degrees};
    use serde_json::{Map, json};

    fn props(v: serde_json::Value) -> Map<String, serde_json::Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn groups_record_and_clear_primitives() {
        let mut engine = HeadlessEngine::new(Viewport::new(800.0, 600.0));
        let g = engine.create_group("parcels");
        let poly = Primitive::Polygon(PolygonPrimitive {
            hierarchy: vec![
                cartesian_from_degrees(5.0, 52.0, 0.0),
                cartesian_from_degrees(5.1, 52.0, 0.0),
                cartesian_from_degrees(5.1, 52.1, 0.0),
            ],
            material: Color::WHITE,
            outline: true,
            outline_color: Color::BLACK,
            extruded_height: None,
        });
        engine.add_primitive(g, poly).unwrap();
        assert_eq!(engine.group_by_name("parcels").unwrap().primitives.len(), 1);

        engine.clear_group(g);
        assert!(engine.group(g).unwrap().primitives.is_empty());
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let mut engine = HeadlessEngine::new(Viewport::new(800.0, 600.0));
        let g = engine.create_group("x");
        let err = engine
            .add_primitive(
                g,
                Primitive::Polygon(PolygonPrimitive {
                    hierarchy: vec![Vec3::ZERO],
                    material: Color::WHITE,
                    outline: false,
                    outline_color: Color::BLACK,
                    extruded_height: None,
                }),
            )
            .unwrap_err();
        assert_eq!(err, DrawError::DegenerateGeometry { vertices: 1 });
    }

    #[test]
    fn default_camera_sees_the_globe() {
        let engine = HeadlessEngine::new(Viewport::new(800.0, 600.0));
        assert!(engine.pick_ellipsoid(engine.viewport().center()).is_some());
    }

    #[test]
    fn dataset_resolves_feature_refs_until_unload() {
        let mut ds = HeadlessDataset::new();
        ds.insert_tile(
            TileId(7),
            HeadlessTile::new("tiles/7.b3dm", vec![props(json!({"identificatie": "NL.1"}))]),
        );
        let r = FeatureRef::new(TileId(7), 0);
        let f = ds.feature_mut(r).expect("feature");
        assert_eq!(f.feature_id(), Some(0));
        assert_eq!(f.content_url(), Some("tiles/7.b3dm"));

        ds.remove_tile(TileId(7));
        assert!(ds.feature_mut(r).is_none());
    }
}
