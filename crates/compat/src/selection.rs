//! Selection and hide state for structure features.
//!
//! [`FeatureOverrides`] is the single owner of the hidden-key set and the
//! current selection. Engine handles are never retained; the selection keeps
//! an identity key plus a [`FeatureRef`] that is dropped when its tile
//! unloads. Every per-feature show/color decision goes through
//! [`FeatureOverrides::apply_overrides`].

use std::collections::BTreeSet;

use persistence::HiddenKeyStore;
use scene::{FeatureRef, StructureDataset, StructureFeature, StructureTile, TileId};

use crate::config::StructurePalette;
use crate::identity::{FeatureKey, IdentityResolver};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected {
        key: FeatureKey,
        /// `None` once the tile holding the feature has unloaded.
        feature: Option<FeatureRef>,
    },
}

impl SelectionState {
    pub fn key(&self) -> Option<&str> {
        match self {
            SelectionState::Idle => None,
            SelectionState::Selected { key, .. } => Some(&key.key),
        }
    }

    pub fn feature(&self) -> Option<FeatureRef> {
        match self {
            SelectionState::Idle => None,
            SelectionState::Selected { feature, .. } => *feature,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SelectionState::Idle)
    }
}

pub struct FeatureOverrides {
    resolver: IdentityResolver,
    palette: StructurePalette,
    hidden: BTreeSet<String>,
    selection: SelectionState,
    store: Box<dyn HiddenKeyStore>,
}

impl std::fmt::Debug for FeatureOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureOverrides")
            .field("hidden", &self.hidden.len())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl FeatureOverrides {
    /// Loads the hidden set from `store`; a failing store starts empty.
    pub fn new(
        resolver: IdentityResolver,
        palette: StructurePalette,
        store: Box<dyn HiddenKeyStore>,
    ) -> Self {
        let hidden = match store.load() {
            Ok(keys) => keys.into_iter().collect(),
            Err(e) => {
                tracing::warn!("hidden keys unavailable, starting empty: {e}");
                BTreeSet::new()
            }
        };
        tracing::debug!(hidden = hidden.len(), "feature overrides ready");
        Self {
            resolver,
            palette,
            hidden,
            selection: SelectionState::Idle,
            store,
        }
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden.contains(key)
    }

    pub fn hidden_keys(&self) -> impl Iterator<Item = &str> {
        self.hidden.iter().map(String::as_str)
    }

    /// Shows or hides, and colors, every feature of a freshly loaded or
    /// visible tile, then sets the tile's edge silhouette. A selection that
    /// lost its handle on unload is re-attached to the feature carrying its
    /// key.
    pub fn apply_overrides<T: StructureTile + ?Sized>(&mut self, tile_id: TileId, tile: &mut T) {
        let selected_ref = self.selection.feature();
        let mut reattach = None;

        for index in 0..tile.features_len() {
            let Some(feature) = tile.feature_mut(index) else {
                continue;
            };
            let key = self.resolver.resolve(&*feature);
            let hidden = key.as_ref().is_some_and(|k| self.hidden.contains(&k.key));
            feature.set_show(!hidden);
            if hidden {
                continue;
            }

            let here = FeatureRef::new(tile_id, index);
            let by_key = key.is_some() && key.as_ref().map(|k| k.key.as_str()) == self.selection.key();
            let by_ref = selected_ref == Some(here);
            let color = if by_key || by_ref {
                self.palette.highlight
            } else {
                self.palette.base
            };
            feature.set_color(color);
            if by_key && selected_ref.is_none() && reattach.is_none() {
                reattach = Some(here);
            }
        }

        if let (Some(r), SelectionState::Selected { feature, .. }) = (reattach, &mut self.selection) {
            tracing::trace!(tile = tile_id.0, index = r.index, "selection re-attached");
            *feature = Some(r);
        }
        tile.set_silhouette(self.palette.edge, self.palette.silhouette_size);
    }

    /// Selects the feature behind `picked` if it has an identity. The
    /// previous highlight is reverted first. Returns `false` (and changes
    /// nothing) when the feature is gone or has no identity.
    pub fn select<D: StructureDataset + ?Sized>(&mut self, dataset: &mut D, picked: FeatureRef) -> bool {
        let Some(key) = dataset
            .feature_mut(picked)
            .and_then(|f| self.resolver.resolve(&*f))
        else {
            return false;
        };

        self.revert_highlight(dataset, Some(picked));
        if let Some(f) = dataset.feature_mut(picked) {
            f.set_color(self.palette.highlight);
        }

        tracing::info!(key = %key.key, "structure feature selected");
        self.selection = SelectionState::Selected {
            key,
            feature: Some(picked),
        };
        true
    }

    /// Reverts the highlight and returns to idle.
    pub fn clear<D: StructureDataset + ?Sized>(&mut self, dataset: Option<&mut D>) {
        if let Some(ds) = dataset {
            self.revert_highlight(ds, None);
        }
        if !self.selection.is_idle() {
            tracing::debug!("selection cleared");
        }
        self.selection = SelectionState::Idle;
    }

    /// Paints the currently selected feature with the base color, unless it
    /// is `keep`. Without a live handle the style is invalidated so the tile
    /// callbacks recolor by key.
    fn revert_highlight<D: StructureDataset + ?Sized>(&self, dataset: &mut D, keep: Option<FeatureRef>) {
        match &self.selection {
            SelectionState::Idle => {}
            SelectionState::Selected { feature: Some(r), .. } => {
                if Some(*r) != keep {
                    if let Some(f) = dataset.feature_mut(*r) {
                        f.set_color(self.palette.base);
                    }
                }
            }
            SelectionState::Selected { feature: None, .. } => dataset.make_style_dirty(),
        }
    }

    /// Hides the selected feature permanently: records its key, persists the
    /// full set and invalidates the dataset style. Returns the hidden key.
    pub fn hide_selected<D: StructureDataset + ?Sized>(
        &mut self,
        dataset: Option<&mut D>,
    ) -> Option<String> {
        let SelectionState::Selected { key, feature } = std::mem::take(&mut self.selection) else {
            return None;
        };
        if !key.is_durable() {
            tracing::warn!(key = %key.key, "hiding a feature without a durable identity; it may reappear after reload");
        }

        self.hidden.insert(key.key.clone());
        self.persist();
        if let Some(ds) = dataset {
            if let Some(f) = feature.and_then(|r| ds.feature_mut(r)) {
                f.set_show(false);
            }
            ds.make_style_dirty();
        }
        tracing::info!(key = %key.key, hidden = self.hidden.len(), "structure feature hidden");
        Some(key.key)
    }

    /// Makes a hidden key visible again. Returns `false` if it was not hidden.
    pub fn unhide<D: StructureDataset + ?Sized>(&mut self, dataset: Option<&mut D>, key: &str) -> bool {
        if !self.hidden.remove(key) {
            return false;
        }
        self.persist();
        if let Some(ds) = dataset {
            ds.make_style_dirty();
        }
        tracing::info!(key, hidden = self.hidden.len(), "structure feature unhidden");
        true
    }

    /// Unhides everything. Returns how many keys were removed.
    pub fn clear_hidden<D: StructureDataset + ?Sized>(&mut self, dataset: Option<&mut D>) -> usize {
        let removed = self.hidden.len();
        if removed == 0 {
            return 0;
        }
        self.hidden.clear();
        self.persist();
        if let Some(ds) = dataset {
            ds.make_style_dirty();
        }
        tracing::info!(removed, "hidden structure features cleared");
        removed
    }

    /// Drops the handle into an unloading tile. The selected key is kept so
    /// the highlight comes back when the tile reloads.
    pub fn on_tile_unload(&mut self, tile: TileId) {
        if let SelectionState::Selected { feature, .. } = &mut self.selection {
            if feature.is_some_and(|r| r.tile == tile) {
                *feature = None;
            }
        }
    }

    fn persist(&mut self) {
        let keys: Vec<String> = self.hidden.iter().cloned().collect();
        if let Err(e) = self.store.save(&keys) {
            tracing::warn!("hidden keys not persisted: {e}");
        }
    }
}
