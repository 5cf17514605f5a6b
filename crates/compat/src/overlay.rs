use foundation::math::{GeoPoint, Vec3};
use scene::{BaseStyle, ColorBlendMode, DatasetLoadError, StructureDataset};

use crate::config::StructurePalette;

/// Translation that lowers a dataset whose heights include the geoid
/// separation onto the bare ellipsoid, measured at `reference`.
pub fn datum_translation(reference: GeoPoint, geoid_offset_m: f64) -> Vec3 {
    let ground = reference.to_cartesian(0.0);
    let high = reference.to_cartesian(geoid_offset_m);
    ground - high
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayStatus {
    Pending,
    Ready,
    Failed(String),
}

/// The tiled structure dataset once the engine has delivered it.
#[derive(Debug)]
pub struct StructureOverlay<D> {
    dataset: Option<D>,
    status: OverlayStatus,
}

impl<D> Default for StructureOverlay<D> {
    fn default() -> Self {
        Self {
            dataset: None,
            status: OverlayStatus::Pending,
        }
    }
}

impl<D: StructureDataset> StructureOverlay<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &OverlayStatus {
        &self.status
    }

    pub fn dataset(&self) -> Option<&D> {
        self.dataset.as_ref()
    }

    pub fn dataset_mut(&mut self) -> Option<&mut D> {
        self.dataset.as_mut()
    }

    /// Aligns and styles a freshly loaded dataset. A failed load leaves the
    /// overlay absent; it is not retried.
    pub fn attach(
        &mut self,
        result: Result<D, DatasetLoadError>,
        translation: Vec3,
        palette: &StructurePalette,
    ) -> bool {
        let mut dataset = match result {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("structure dataset failed to load: {e}");
                self.status = OverlayStatus::Failed(e.to_string());
                return false;
            }
        };

        dataset.set_model_translation(translation);
        dataset.set_base_style(BaseStyle {
            color: palette.base,
            blend_mode: ColorBlendMode::Replace,
            blend_amount: 1.0,
        });
        dataset.make_style_dirty();
        tracing::info!(?translation, "structure dataset attached");

        self.dataset = Some(dataset);
        self.status = OverlayStatus::Ready;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{OverlayStatus, StructureOverlay, datum_translation};
    use crate::config::StructurePalette;
    use foundation::math::{EnuFrame, GeoPoint, Geodetic};
    use scene::headless::HeadlessDataset;
    use scene::{ColorBlendMode, DatasetLoadError};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn translation_points_straight_down() {
        let reference = GeoPoint::new(5.3, 52.2);
        let t = datum_translation(reference, 43.0);
        assert_close(t.length(), 43.0, 1e-6);

        let up = EnuFrame::at(Geodetic::from_degrees(5.3, 52.2, 0.0)).up;
        assert_close(t.dot(up), -43.0, 1e-6);
    }

    #[test]
    fn attach_styles_the_dataset() {
        let mut overlay: StructureOverlay<HeadlessDataset> = StructureOverlay::new();
        assert_eq!(overlay.status(), &OverlayStatus::Pending);

        let palette = StructurePalette::default();
        let t = datum_translation(GeoPoint::new(5.3, 52.2), 43.0);
        assert!(overlay.attach(Ok(HeadlessDataset::new()), t, &palette));
        assert_eq!(overlay.status(), &OverlayStatus::Ready);

        let ds = overlay.dataset_mut().unwrap();
        assert_eq!(ds.model_translation(), Some(t));
        let style = ds.base_style().unwrap();
        assert_eq!(style.color, palette.base);
        assert_eq!(style.blend_mode, ColorBlendMode::Replace);
        assert_eq!(style.blend_amount, 1.0);
        assert!(ds.take_style_dirty());
    }

    #[test]
    fn failed_load_leaves_overlay_absent() {
        let mut overlay: StructureOverlay<HeadlessDataset> = StructureOverlay::new();
        let err = DatasetLoadError::Network("503".to_string());
        assert!(!overlay.attach(Err(err), Default::default(), &StructurePalette::default()));
        assert!(overlay.dataset().is_none());
        assert!(matches!(overlay.status(), OverlayStatus::Failed(msg) if msg.contains("503")));
    }
}
