//! Capability traits for an asynchronously streamed, tiled 3D structure
//! dataset (buildings). The engine owns tiles and features; callers only hold
//! [`TileId`]/[`FeatureRef`] values and look the handles up again on use, so a
//! reference into an unloaded tile simply resolves to `None`.

use foundation::math::Vec3;
use serde_json::Value;

use crate::color::Color;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u64);

/// Weak reference to one feature of one loaded tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FeatureRef {
    pub tile: TileId,
    pub index: usize,
}

impl FeatureRef {
    pub fn new(tile: TileId, index: usize) -> Self {
        Self { tile, index }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ColorBlendMode {
    Highlight,
    #[default]
    Replace,
    Mix,
}

/// Dataset-wide style applied before any per-feature override.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BaseStyle {
    pub color: Color,
    pub blend_mode: ColorBlendMode,
    pub blend_amount: f32,
}

pub trait StructureFeature {
    fn property(&self, name: &str) -> Option<&Value>;
    /// Index of the feature inside its tile's content, when the engine exposes one.
    fn feature_id(&self) -> Option<u32>;
    /// Source of the tile content the feature was decoded from.
    fn content_url(&self) -> Option<&str>;
    fn set_show(&mut self, show: bool);
    fn set_color(&mut self, color: Color);
}

pub trait StructureTile {
    type Feature: StructureFeature;

    fn features_len(&self) -> usize;
    fn feature_mut(&mut self, index: usize) -> Option<&mut Self::Feature>;
    fn set_silhouette(&mut self, color: Color, size: f32);
}

pub trait StructureDataset {
    type Tile: StructureTile;

    /// Rigid translation applied as the dataset's model transform.
    fn set_model_translation(&mut self, translation: Vec3);
    fn set_base_style(&mut self, style: BaseStyle);
    /// Ask the engine to re-run the per-tile visible callback on the next paint.
    fn make_style_dirty(&mut self);
    fn tile_mut(&mut self, id: TileId) -> Option<&mut Self::Tile>;

    fn feature_mut(
        &mut self,
        feature: FeatureRef,
    ) -> Option<&mut <Self::Tile as StructureTile>::Feature> {
        self.tile_mut(feature.tile)?.feature_mut(feature.index)
    }
}
