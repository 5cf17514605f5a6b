use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use formats::FeatureCollection;
use foundation::math::{height_to_zoom, zoom_to_height};
use layers::{LayerDef, LayerStore};
use persistence::{HiddenKeyStore, JsonFileHiddenKeyStore};
use scene::headless::HeadlessEngine;
use scene::{Primitive, Viewport};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_HIDDEN_FILE: &str = "data/hidden-keys.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline tools for the slippy-map compatibility layer")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one layer over a GeoJSON file and print the primitives as JSON
    Render {
        /// GeoJSON FeatureCollection
        #[arg(long)]
        data: PathBuf,

        /// Layer definition JSON ({"id", "type", "source", "paint", "layout"})
        #[arg(long)]
        layer: PathBuf,

        /// Print only the counts
        #[arg(long)]
        summary: bool,
    },

    /// Zoom level for a camera height
    Zoom {
        #[arg(long)]
        height: f64,

        #[arg(long, default_value_t = 52.0)]
        lat: f64,

        /// Viewport height in pixels (900 when omitted)
        #[arg(long)]
        viewport_height: Option<f64>,
    },

    /// Camera height for a zoom level
    Height {
        #[arg(long)]
        zoom: f64,

        #[arg(long, default_value_t = 52.0)]
        lat: f64,

        /// Viewport height in pixels (900 when omitted)
        #[arg(long)]
        viewport_height: Option<f64>,
    },

    /// Inspect or edit a hidden-key file
    Hidden {
        /// Snapshot file (default: $COMPAT_HIDDEN_KEYS_FILE or data/hidden-keys.json)
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        action: HiddenAction,
    },
}

#[derive(Subcommand, Debug)]
enum HiddenAction {
    List,
    Add { keys: Vec<String> },
    Remove { keys: Vec<String> },
    Clear,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), String> {
    match args.command {
        Command::Render {
            data,
            layer,
            summary,
        } => {
            let report = cmd_render(&data, &layer)?;
            let out = if summary {
                serde_json::to_string_pretty(&report.counts())
            } else {
                serde_json::to_string_pretty(&report)
            }
            .map_err(|e| format!("serialize report: {e}"))?;
            println!("{out}");
        }
        Command::Zoom {
            height,
            lat,
            viewport_height,
        } => println!("{}", height_to_zoom(height, lat, viewport_height)),
        Command::Height {
            zoom,
            lat,
            viewport_height,
        } => println!("{}", zoom_to_height(zoom, lat, viewport_height)),
        Command::Hidden { file, action } => {
            let path = file.unwrap_or_else(|| {
                env::var("COMPAT_HIDDEN_KEYS_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_HIDDEN_FILE))
            });
            for key in cmd_hidden(&path, action)? {
                println!("{key}");
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RenderReport {
    layer: String,
    features: usize,
    primitives: Vec<PrimitiveSummary>,
}

#[derive(Debug, Serialize, PartialEq)]
struct PrimitiveSummary {
    kind: &'static str,
    vertices: usize,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    extruded_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
struct RenderCounts {
    layer: String,
    features: usize,
    primitives: usize,
}

impl RenderReport {
    fn counts(&self) -> RenderCounts {
        RenderCounts {
            layer: self.layer.clone(),
            features: self.features,
            primitives: self.primitives.len(),
        }
    }
}

fn cmd_render(data: &Path, layer: &Path) -> Result<RenderReport, String> {
    let raw = fs::read_to_string(data).map_err(|e| format!("read {data:?}: {e}"))?;
    let collection = FeatureCollection::from_geojson_str(&raw).map_err(|e| format!("{data:?}: {e}"))?;
    let raw = fs::read_to_string(layer).map_err(|e| format!("read {layer:?}: {e}"))?;
    let def: LayerDef = serde_json::from_str(&raw).map_err(|e| format!("{layer:?}: {e}"))?;
    render_report(collection, def)
}

fn render_report(collection: FeatureCollection, def: LayerDef) -> Result<RenderReport, String> {
    let mut engine = HeadlessEngine::new(Viewport::new(1280.0, 900.0));
    let mut store = LayerStore::new();
    let features = collection.len();
    let layer_id = def.id.clone();

    store.add_source(&mut engine, &def.source.clone(), Some(collection));
    let group = store.add_layer(&mut engine, def);
    let primitives = engine
        .group(group)
        .ok_or_else(|| format!("layer {layer_id} has no drawable group"))?
        .primitives
        .iter()
        .map(summarize)
        .collect::<Vec<_>>();

    info!(layer = %layer_id, features, primitives = primitives.len(), "rendered");
    Ok(RenderReport {
        layer: layer_id,
        features,
        primitives,
    })
}

fn summarize(p: &Primitive) -> PrimitiveSummary {
    let (kind, color, extruded_height, text) = match p {
        Primitive::Polygon(poly) => ("polygon", poly.material, poly.extruded_height, None),
        Primitive::Polyline(line) => ("polyline", line.material, None, None),
        Primitive::Point(point) => ("point", point.color, None, None),
        Primitive::Label(label) => ("label", label.fill_color, None, Some(label.text.clone())),
    };
    PrimitiveSummary {
        kind,
        vertices: p.positions().len(),
        color: color.to_css_hex(),
        extruded_height,
        text,
    }
}

fn cmd_hidden(path: &Path, action: HiddenAction) -> Result<Vec<String>, String> {
    let mut store = JsonFileHiddenKeyStore::new(path);
    let mut keys = store.load().map_err(|e| e.to_string())?;

    let changed = match action {
        HiddenAction::List => false,
        HiddenAction::Add { keys: add } => {
            keys.extend(add);
            true
        }
        HiddenAction::Remove { keys: remove } => {
            keys.retain(|k| !remove.contains(k));
            true
        }
        HiddenAction::Clear => {
            keys.clear();
            true
        }
    };

    if changed {
        store.save(&keys).map_err(|e| e.to_string())?;
        keys = store.load().map_err(|e| e.to_string())?;
        info!(path = ?path, count = keys.len(), "hidden keys updated");
    }
    Ok(keys)
}
