//! Sources and the layers bound to them.
//!
//! Every layer owns one engine drawable group. Rendering is a full rebuild:
//! the group is cleared and refilled from the bound source. Mutating a source
//! re-renders its layers before returning, in layer registration order.

use std::collections::HashMap;

use formats::FeatureCollection;
use scene::{DrawTarget, GroupId};

use crate::render::build_primitives;
use crate::style::LayerDef;

#[derive(Debug, Clone)]
struct LayerEntry {
    def: LayerDef,
    group: GroupId,
}

#[derive(Debug, Default)]
pub struct LayerStore {
    sources: HashMap<String, FeatureCollection>,
    /// Registration order.
    layers: Vec<LayerEntry>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a source and re-renders the layers already
    /// bound to its id.
    pub fn add_source<T: DrawTarget + ?Sized>(
        &mut self,
        target: &mut T,
        id: &str,
        data: Option<FeatureCollection>,
    ) {
        let data = data.unwrap_or_else(FeatureCollection::empty);
        tracing::debug!(source = id, features = data.len(), "add source");
        self.sources.insert(id.to_string(), data);
        self.render_bound(target, id);
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    /// Replaces the data of an existing source. Returns `false` when the
    /// source is unknown.
    pub fn set_data<T: DrawTarget + ?Sized>(
        &mut self,
        target: &mut T,
        id: &str,
        data: FeatureCollection,
    ) -> bool {
        let Some(slot) = self.sources.get_mut(id) else {
            tracing::debug!(source = id, "set_data on unknown source ignored");
            return false;
        };
        *slot = data;
        self.render_bound(target, id);
        true
    }

    /// Registers a layer, creating its drawable group, and renders it.
    /// A layer id that already exists keeps its group and takes the new
    /// definition.
    pub fn add_layer<T: DrawTarget + ?Sized>(&mut self, target: &mut T, def: LayerDef) -> GroupId {
        let id = def.id.clone();
        let group = match self.layers.iter_mut().find(|e| e.def.id == id) {
            Some(entry) => {
                entry.def = def;
                entry.group
            }
            None => {
                let group = target.create_group(&id);
                self.layers.push(LayerEntry { def, group });
                group
            }
        };
        self.render_layer(target, &id);
        group
    }

    pub fn get_layer(&self, id: &str) -> Option<&LayerDef> {
        self.entry(id).map(|e| &e.def)
    }

    pub fn layer_group(&self, id: &str) -> Option<GroupId> {
        self.entry(id).map(|e| e.group)
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|e| e.def.id.as_str())
    }

    /// Clears and rebuilds one layer. Returns the number of primitives the
    /// target accepted; rejected primitives are logged and skipped.
    pub fn render_layer<T: DrawTarget + ?Sized>(&self, target: &mut T, id: &str) -> usize {
        let Some(entry) = self.entry(id) else {
            return 0;
        };
        target.clear_group(entry.group);

        let empty = FeatureCollection::empty();
        let data = self.sources.get(&entry.def.source).unwrap_or(&empty);
        let mut drawn = 0;
        for primitive in build_primitives(&entry.def, data) {
            let kind = primitive.kind();
            match target.add_primitive(entry.group, primitive) {
                Ok(()) => drawn += 1,
                Err(e) => tracing::warn!(layer = id, ?kind, "primitive skipped: {e}"),
            }
        }
        tracing::debug!(layer = id, source = %entry.def.source, drawn, "layer rendered");
        drawn
    }

    fn render_bound<T: DrawTarget + ?Sized>(&self, target: &mut T, source: &str) {
        for entry in self.layers.iter().filter(|e| e.def.source == source) {
            self.render_layer(target, &entry.def.id);
        }
    }

    fn entry(&self, id: &str) -> Option<&LayerEntry> {
        self.layers.iter().find(|e| e.def.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::LayerStore;
    use crate::style::{LayerDef, LayerKind};
    use formats::FeatureCollection;
    use scene::headless::HeadlessEngine;
    use scene::{DrawError, DrawTarget, GroupId, Primitive, Viewport};
    use serde_json::json;

    fn engine() -> HeadlessEngine {
        HeadlessEngine::new(Viewport::new(800.0, 600.0))
    }

    fn plots(n: usize) -> FeatureCollection {
        let features: Vec<_> = (0..n)
            .map(|i| {
                let x = 5.0 + i as f64 * 0.01;
                json!({"type": "Feature", "properties": {"n": i},
                       "geometry": {"type": "Polygon", "coordinates": [
                           [[x, 52.0], [x + 0.005, 52.0], [x + 0.005, 52.005], [x, 52.0]]
                       ]}})
            })
            .collect();
        FeatureCollection::from_geojson_value(&json!({"type": "FeatureCollection", "features": features}))
            .expect("collection")
    }

    #[test]
    fn set_data_rebuilds_instead_of_appending() {
        let mut eng = engine();
        let mut store = LayerStore::new();
        store.add_source(&mut eng, "plots", None);
        let group = store.add_layer(&mut eng, LayerDef::new("fill", LayerKind::Fill, "plots"));
        assert!(eng.group(group).expect("group").primitives.is_empty());

        assert!(store.set_data(&mut eng, "plots", plots(3)));
        assert_eq!(eng.group(group).expect("group").primitives.len(), 3);
        assert!(store.set_data(&mut eng, "plots", plots(3)));
        assert_eq!(eng.group(group).expect("group").primitives.len(), 3);
    }

    #[test]
    fn layer_without_source_renders_nothing_until_source_arrives() {
        let mut eng = engine();
        let mut store = LayerStore::new();
        let group = store.add_layer(&mut eng, LayerDef::new("edges", LayerKind::Line, "later"));
        assert_eq!(store.render_layer(&mut eng, "edges"), 0);

        store.add_source(&mut eng, "later", Some(plots(2)));
        let prims = &eng.group(group).expect("group").primitives;
        assert_eq!(prims.len(), 2);
        assert!(prims.iter().all(|p| matches!(p, Primitive::Polyline(_))));
    }

    #[test]
    fn set_data_on_unknown_source_is_ignored() {
        let mut eng = engine();
        let mut store = LayerStore::new();
        assert!(!store.set_data(&mut eng, "nope", plots(1)));
        assert!(!store.has_source("nope"));
    }

    #[test]
    fn rejected_primitives_are_skipped() {
        let mut eng = engine();
        let mut store = LayerStore::new();
        let broken = FeatureCollection::from_geojson_value(&json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {},
                          "geometry": {"type": "Polygon", "coordinates": [[[5.0, 52.0], [5.1, 52.0]]]}}]
        }))
        .expect("collection");
        let mut data = plots(1);
        data.features.extend(broken.features);
        store.add_source(&mut eng, "s", Some(data));
        store.add_layer(&mut eng, LayerDef::new("f", LayerKind::Fill, "s"));
        assert_eq!(store.render_layer(&mut eng, "f"), 1);
    }

    #[test]
    fn re_adding_a_layer_keeps_its_group() {
        let mut eng = engine();
        let mut store = LayerStore::new();
        store.add_source(&mut eng, "s", Some(plots(2)));
        let first = store.add_layer(&mut eng, LayerDef::new("f", LayerKind::Fill, "s"));
        let second = store.add_layer(
            &mut eng,
            LayerDef::new("f", LayerKind::Line, "s").with_paint("line-width", json!(4)),
        );
        assert_eq!(first, second);
        assert_eq!(eng.groups().len(), 1);
        assert_eq!(store.get_layer("f").map(|d| d.kind), Some(LayerKind::Line));
        assert_eq!(store.layer_ids().collect::<Vec<_>>(), vec!["f"]);
    }

    /// Records every draw call in order.
    #[derive(Default)]
    struct Recorder {
        groups: Vec<String>,
        calls: Vec<(&'static str, GroupId)>,
    }

    impl DrawTarget for Recorder {
        fn create_group(&mut self, name: &str) -> GroupId {
            self.groups.push(name.to_string());
            GroupId(self.groups.len() as u32 - 1)
        }

        fn clear_group(&mut self, group: GroupId) {
            self.calls.push(("clear", group));
        }

        fn add_primitive(&mut self, group: GroupId, _primitive: Primitive) -> Result<(), DrawError> {
            self.calls.push(("add", group));
            Ok(())
        }
    }

    #[test]
    fn set_data_rerenders_bound_layers_in_registration_order() {
        let mut rec = Recorder::default();
        let mut store = LayerStore::new();
        store.add_source(&mut rec, "plots", Some(plots(1)));
        store.add_source(&mut rec, "other", Some(plots(1)));
        let outline = store.add_layer(&mut rec, LayerDef::new("outline", LayerKind::Line, "plots"));
        let unrelated = store.add_layer(&mut rec, LayerDef::new("other", LayerKind::Fill, "other"));
        let fill = store.add_layer(&mut rec, LayerDef::new("fill", LayerKind::Fill, "plots"));
        rec.calls.clear();

        assert!(store.set_data(&mut rec, "plots", plots(2)));
        assert_eq!(
            rec.calls,
            vec![
                ("clear", outline),
                ("add", outline),
                ("add", outline),
                ("clear", fill),
                ("add", fill),
                ("add", fill),
            ]
        );
        assert!(rec.calls.iter().all(|(_, g)| *g != unrelated));
    }
}
