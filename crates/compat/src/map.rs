//! The slippy-map facade.
//!
//! [`CompatMap`] owns the engine and presents the familiar map surface:
//! camera getters/setters, named sources, declarative layers and events.
//! Engine callbacks are forwarded by the host through the `handle_*`
//! methods; the deferred `load` event goes out on the first [`CompatMap::tick`].

use formats::FeatureCollection;
use foundation::math::{GeoPoint, Vec2};
use layers::{LayerDef, LayerStore};
use persistence::HiddenKeyStore;
use runtime::EventBus;
use scene::{
    DatasetLoadError, DatasetRequest, GlobeEngine, PickedObject, SceneSetup, StructureDataset, TileId,
};

use crate::camera::{CameraController, CameraPose};
use crate::config::{MapOptions, ShimConfig, StructurePalette};
use crate::identity::IdentityResolver;
use crate::input::KeyEvent;
use crate::overlay::{OverlayStatus, StructureOverlay, datum_translation};
use crate::selection::{FeatureOverrides, SelectionState};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MapEvent {
    Load,
    MoveEnd,
}

impl MapEvent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "load" => Some(MapEvent::Load),
            "moveend" => Some(MapEvent::MoveEnd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Load,
    MoveEnd(CameraPose),
}

/// Per-tile callbacks of the structure dataset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileEvent {
    Loaded(TileId),
    Visible(TileId),
    Unloaded(TileId),
}

pub struct CompatMap<E: GlobeEngine> {
    engine: E,
    config: ShimConfig,
    camera: CameraController,
    layers: LayerStore,
    overlay: StructureOverlay<E::Dataset>,
    overrides: FeatureOverrides,
    events: EventBus<MapEvent, EventPayload>,
}

impl<E: GlobeEngine> CompatMap<E> {
    pub fn new(engine: E, options: MapOptions, hidden_keys: Box<dyn HiddenKeyStore>) -> Self {
        Self::with_config(engine, options, ShimConfig::default(), hidden_keys)
    }

    /// Sets up the scene, requests the structure dataset and places the
    /// camera. Invalid colors in `config` fall back to the defaults.
    pub fn with_config(
        mut engine: E,
        options: MapOptions,
        config: ShimConfig,
        hidden_keys: Box<dyn HiddenKeyStore>,
    ) -> Self {
        let palette = config.palette().unwrap_or_else(|e| {
            tracing::warn!("{e}; using default structure colors");
            StructurePalette::default()
        });
        let background = config.background().unwrap_or_else(|e| {
            tracing::warn!("{e}; using default background");
            scene::Color::from_rgba8(0x87, 0xCE, 0xEB, 0xFF)
        });

        let overrides = FeatureOverrides::new(
            IdentityResolver::new(config.identity_keys.iter().cloned()),
            palette,
            hidden_keys,
        );

        engine.configure_scene(&SceneSetup {
            imagery_url: config.imagery_url.clone(),
            background,
            show_sky_box: config.show_sky_box,
        });
        engine.request_structure_dataset(&DatasetRequest {
            url: config.structure_url.clone(),
            maximum_screen_space_error: config.maximum_screen_space_error,
        });

        let mut camera = CameraController::new(CameraPose {
            center: options.center.into(),
            zoom: options.zoom,
            pitch_deg: options.pitch,
            bearing_deg: options.bearing,
        });
        camera.apply(&mut engine);

        let mut events = EventBus::new();
        events.schedule(MapEvent::Load, EventPayload::Load);
        tracing::info!(container = ?options.container, "map created");

        Self {
            engine,
            config,
            camera,
            layers: LayerStore::new(),
            overlay: StructureOverlay::new(),
            overrides,
            events,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    // Events

    pub fn on(&mut self, event: MapEvent, callback: impl FnMut(&EventPayload) + 'static) {
        self.events.subscribe(event, callback);
    }

    /// Subscribes by slippy-map event name. Unknown names are accepted but
    /// never fire; returns whether the name is known.
    pub fn on_named(&mut self, name: &str, callback: impl FnMut(&EventPayload) + 'static) -> bool {
        match MapEvent::from_name(name) {
            Some(event) => {
                self.on(event, callback);
                true
            }
            None => {
                tracing::debug!(name, "subscription to unsupported event ignored");
                false
            }
        }
    }

    /// Delivers deferred events. Returns how many were delivered.
    pub fn tick(&mut self) -> usize {
        self.events.flush()
    }

    // Sources and layers

    /// Registers a source (empty when `data` is `None`) and returns a handle.
    pub fn add_source(&mut self, id: &str, data: Option<FeatureCollection>) -> SourceRef<'_, E> {
        self.layers.add_source(&mut self.engine, id, data);
        SourceRef {
            map: self,
            id: id.to_string(),
        }
    }

    pub fn get_source(&mut self, id: &str) -> Option<SourceRef<'_, E>> {
        if !self.layers.has_source(id) {
            return None;
        }
        Some(SourceRef {
            map: self,
            id: id.to_string(),
        })
    }

    pub fn add_layer(&mut self, def: LayerDef) {
        self.layers.add_layer(&mut self.engine, def);
    }

    pub fn get_layer(&self, id: &str) -> Option<&LayerDef> {
        self.layers.get_layer(id)
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    // Camera

    pub fn set_center(&mut self, center: impl Into<GeoPoint>) {
        self.camera.set_center(&mut self.engine, center.into());
    }

    pub fn get_center(&mut self) -> GeoPoint {
        self.camera.refresh(&self.engine).center
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.camera.set_zoom(&mut self.engine, zoom);
    }

    pub fn get_zoom(&mut self) -> f64 {
        self.camera.refresh(&self.engine).zoom
    }

    pub fn get_pitch(&mut self) -> f64 {
        self.camera.refresh(&self.engine).pitch_deg
    }

    pub fn get_bearing(&mut self) -> f64 {
        self.camera.refresh(&self.engine).bearing_deg
    }

    pub fn resize(&mut self) {
        self.engine.resize();
    }

    // Structure overlay

    pub fn overlay_status(&self) -> &OverlayStatus {
        self.overlay.status()
    }

    pub fn structure(&self) -> Option<&E::Dataset> {
        self.overlay.dataset()
    }

    pub fn structure_mut(&mut self) -> Option<&mut E::Dataset> {
        self.overlay.dataset_mut()
    }

    pub fn selection(&self) -> &SelectionState {
        self.overrides.selection()
    }

    pub fn hidden_keys(&self) -> Vec<String> {
        self.overrides.hidden_keys().map(str::to_string).collect()
    }

    pub fn unhide(&mut self, key: &str) -> bool {
        self.overrides.unhide(self.overlay.dataset_mut(), key)
    }

    pub fn clear_hidden(&mut self) -> usize {
        self.overrides.clear_hidden(self.overlay.dataset_mut())
    }

    // Engine callbacks

    pub fn handle_structure_loaded(&mut self, result: Result<E::Dataset, DatasetLoadError>) {
        let translation = datum_translation(self.config.reference_point(), self.config.geoid_offset_m);
        let palette = self.config.palette().unwrap_or_default();
        self.overlay.attach(result, translation, &palette);
    }

    pub fn handle_tile_event(&mut self, event: TileEvent) {
        match event {
            TileEvent::Loaded(id) | TileEvent::Visible(id) => {
                let Some(tile) = self.overlay.dataset_mut().and_then(|ds| ds.tile_mut(id)) else {
                    tracing::trace!(tile = id.0, "tile event for unknown tile");
                    return;
                };
                self.overrides.apply_overrides(id, tile);
            }
            TileEvent::Unloaded(id) => self.overrides.on_tile_unload(id),
        }
    }

    /// Left click at a canvas position; `None` when the host could not
    /// supply one. Selects the front-most structure feature with an
    /// identity, or clears the selection.
    pub fn handle_click(&mut self, position: Option<Vec2>) {
        let Some(position) = position else {
            self.overrides.clear(self.overlay.dataset_mut());
            return;
        };

        let picks = self.engine.drill_pick(position, self.config.pick_limit);
        if let Some(dataset) = self.overlay.dataset_mut() {
            for pick in &picks {
                if let PickedObject::Structure(r) = pick {
                    if self.overrides.select(dataset, *r) {
                        return;
                    }
                }
            }
        }

        tracing::debug!(picks = picks.len(), "click hit no structure feature");
        self.overrides.clear(self.overlay.dataset_mut());
    }

    /// Document-level key handler. Returns `true` when the event was
    /// consumed and default handling should be suppressed.
    pub fn handle_key_down(&mut self, event: &KeyEvent) -> bool {
        if !event.is_delete() || event.target.takes_text() {
            return false;
        }
        if self.overrides.selection().is_idle() {
            return false;
        }
        self.overrides.hide_selected(self.overlay.dataset_mut()).is_some()
    }

    /// Camera settled after navigation: refresh the pose and notify.
    pub fn handle_camera_move_end(&mut self) {
        let pose = self.camera.refresh(&self.engine);
        self.events.emit(&MapEvent::MoveEnd, &EventPayload::MoveEnd(pose));
    }
}

impl<E: GlobeEngine + std::fmt::Debug> std::fmt::Debug for CompatMap<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatMap")
            .field("engine", &self.engine)
            .field("camera", &self.camera)
            .field("overlay", self.overlay.status())
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

/// Handle to a registered source.
pub struct SourceRef<'a, E: GlobeEngine> {
    map: &'a mut CompatMap<E>,
    id: String,
}

impl<E: GlobeEngine> SourceRef<'_, E> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> Option<&FeatureCollection> {
        self.map.layers.source(&self.id)
    }

    /// Replaces the data and re-renders every layer bound to this source
    /// before returning.
    pub fn set_data(&mut self, data: FeatureCollection) {
        let map = &mut *self.map;
        map.layers.set_data(&mut map.engine, &self.id, data);
    }
}
