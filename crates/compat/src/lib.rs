//! Slippy-map compatibility layer over a 3D globe engine.

pub mod camera;
pub mod config;
pub mod identity;
pub mod input;
pub mod map;
pub mod overlay;
pub mod selection;

pub use camera::{CameraController, CameraPose};
pub use config::{MapOptions, ShimConfig, StructurePalette};
pub use identity::{Durability, FeatureKey, IdentityResolver};
pub use input::{FocusTarget, KeyEvent};
pub use map::{CompatMap, EventPayload, MapEvent, SourceRef, TileEvent};
pub use overlay::{OverlayStatus, StructureOverlay, datum_translation};
pub use selection::{FeatureOverrides, SelectionState};
