use std::env;

use serde::{Deserialize, Serialize};

use foundation::math::GeoPoint;
use scene::Color;

/// Property names tried, in order, when building a feature's identity key.
pub const DEFAULT_IDENTITY_KEYS: [&str; 5] = ["identificatie", "id", "objectid", "fid", "gml_id"];

pub const DEFAULT_STRUCTURE_URL: &str =
    "https://data.3dbag.nl/v20250903/cesium3dtiles/lod22/tileset.json";
pub const DEFAULT_IMAGERY_URL: &str = "https://tile.openstreetmap.org/";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Json(String),
    InvalidColor { field: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(msg) => write!(f, "invalid config json: {msg}"),
            ConfigError::InvalidColor { field, value } => {
                write!(f, "invalid color for {field}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Deployment settings for the compatibility layer. Every field has a
/// default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    pub structure_url: String,
    pub maximum_screen_space_error: f64,
    pub imagery_url: String,
    pub background_color: String,
    pub show_sky_box: bool,
    /// Point where the dataset's height datum is pinned to the ellipsoid.
    pub reference_lon_deg: f64,
    pub reference_lat_deg: f64,
    /// Geoid height at the reference point; the dataset is lowered by it.
    pub geoid_offset_m: f64,
    pub structure_color: String,
    pub highlight_color: String,
    pub edge_color: String,
    pub edge_alpha: f32,
    pub silhouette_size: f32,
    pub pick_limit: usize,
    pub identity_keys: Vec<String>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            structure_url: DEFAULT_STRUCTURE_URL.to_string(),
            maximum_screen_space_error: 8.0,
            imagery_url: DEFAULT_IMAGERY_URL.to_string(),
            background_color: "#87CEEB".to_string(),
            show_sky_box: false,
            reference_lon_deg: 5.3,
            reference_lat_deg: 52.2,
            geoid_offset_m: 43.0,
            structure_color: "#F8FAFC".to_string(),
            highlight_color: "#F59E0B".to_string(),
            edge_color: "#111827".to_string(),
            edge_alpha: 0.22,
            silhouette_size: 0.35,
            pick_limit: 20,
            identity_keys: DEFAULT_IDENTITY_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ShimConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.palette()?;
        Ok(config)
    }

    /// Defaults overridden by `COMPAT_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Applies overrides from `lookup`; unset or unparsable values keep the
    /// current setting.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.structure_url = env_var_string(&lookup, "COMPAT_STRUCTURE_URL", &self.structure_url);
        self.geoid_offset_m = env_var_f64(&lookup, "COMPAT_GEOID_OFFSET_M", self.geoid_offset_m);
        self.pick_limit = env_var_usize(&lookup, "COMPAT_PICK_LIMIT", self.pick_limit);
        self.highlight_color =
            env_var_string(&lookup, "COMPAT_HIGHLIGHT_COLOR", &self.highlight_color);

        let keys: Vec<String> = lookup("COMPAT_IDENTITY_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if !keys.is_empty() {
            self.identity_keys = keys;
        }
    }

    pub fn reference_point(&self) -> GeoPoint {
        GeoPoint::new(self.reference_lon_deg, self.reference_lat_deg)
    }

    pub fn background(&self) -> Result<Color, ConfigError> {
        parse_color("background_color", &self.background_color)
    }

    pub fn palette(&self) -> Result<StructurePalette, ConfigError> {
        Ok(StructurePalette {
            base: parse_color("structure_color", &self.structure_color)?,
            highlight: parse_color("highlight_color", &self.highlight_color)?,
            edge: parse_color("edge_color", &self.edge_color)?.with_alpha(self.edge_alpha),
            silhouette_size: self.silhouette_size,
        })
    }
}

/// Colors the structure overlay paints with.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StructurePalette {
    pub base: Color,
    pub highlight: Color,
    pub edge: Color,
    pub silhouette_size: f32,
}

impl Default for StructurePalette {
    fn default() -> Self {
        Self {
            base: Color::from_rgba8(0xF8, 0xFA, 0xFC, 0xFF),
            highlight: Color::from_rgba8(0xF5, 0x9E, 0x0B, 0xFF),
            edge: Color::from_rgba8(0x11, 0x18, 0x27, 0xFF).with_alpha(0.22),
            silhouette_size: 0.35,
        }
    }
}

fn parse_color(field: &'static str, value: &str) -> Result<Color, ConfigError> {
    Color::from_css(value).ok_or_else(|| ConfigError::InvalidColor {
        field,
        value: value.to_string(),
    })
}

fn env_var_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_var_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn default_center() -> [f64; 2] {
    [5.3, 52.2]
}

fn default_zoom() -> f64 {
    8.0
}

fn default_pitch() -> f64 {
    55.0
}

fn default_bearing() -> f64 {
    -15.0
}

/// Construction options in slippy-map shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    /// Host element id; only meaningful to the embedding page.
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default = "default_center")]
    pub center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default = "default_pitch")]
    pub pitch: f64,
    #[serde(default = "default_bearing")]
    pub bearing: f64,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            container: None,
            center: default_center(),
            zoom: default_zoom(),
            pitch: default_pitch(),
            bearing: default_bearing(),
        }
    }
}
