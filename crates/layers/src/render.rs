//! Translation of one layer over one collection into engine primitives.

use formats::{Feature, FeatureCollection};
use foundation::math::{GeoPoint, Vec2};
use scene::{
    Color, LabelPrimitive, PointPrimitive, PolygonPrimitive, PolylinePrimitive, Primitive,
    VerticalOrigin,
};
use serde_json::{Map, Value};

use crate::expression::display_string;
use crate::style::{LayerDef, LayerKind, color_or, number_or, resolve};

pub const DEFAULT_FILL_COLOR: Color = Color::from_rgba8(0x7C, 0x3A, 0xED, 0xFF);
pub const DEFAULT_FILL_OPACITY: f64 = 0.22;
pub const DEFAULT_OUTLINE_COLOR: Color = Color::BLACK;
pub const FILL_OUTLINE_ALPHA: f32 = 0.8;
pub const EXTRUSION_OUTLINE_ALPHA: f32 = 0.9;

pub const DEFAULT_LINE_COLOR: Color = Color::from_rgba8(0x4C, 0x1D, 0x95, 0xFF);
pub const DEFAULT_LINE_WIDTH: f64 = 1.5;

pub const DEFAULT_CIRCLE_RADIUS: f64 = 6.0;
pub const DEFAULT_CIRCLE_COLOR: Color = Color::from_rgba8(0xF5, 0x9E, 0x0B, 0xFF);
pub const DEFAULT_CIRCLE_STROKE_COLOR: Color = Color::from_rgba8(0xB4, 0x53, 0x09, 0xFF);
pub const DEFAULT_CIRCLE_STROKE_WIDTH: f64 = 1.0;

pub const DEFAULT_TEXT_SIZE: f64 = 12.0;
pub const DEFAULT_TEXT_COLOR: Color = Color::from_rgba8(0x33, 0x33, 0x33, 0xFF);
/// Labels sit above their anchor point.
pub const LABEL_PIXEL_OFFSET: Vec2 = Vec2 { x: 0.0, y: -10.0 };

/// All primitives for `def` over `collection`, in feature order.
pub fn build_primitives(def: &LayerDef, collection: &FeatureCollection) -> Vec<Primitive> {
    let mut out = Vec::new();
    for feature in &collection.features {
        feature_primitives(def, feature, &mut out);
    }
    out
}

fn feature_primitives(def: &LayerDef, feature: &Feature, out: &mut Vec<Primitive>) {
    let Some(geometry) = &feature.geometry else {
        return;
    };
    let props = &feature.properties;

    match def.kind {
        LayerKind::Fill | LayerKind::FillExtrusion => {
            let style = FillStyle::resolve(def, props);
            for ring in geometry.outer_rings() {
                out.push(Primitive::Polygon(PolygonPrimitive {
                    hierarchy: ring.iter().map(|p| p.to_cartesian(style.base)).collect(),
                    material: style.fill,
                    outline: true,
                    outline_color: style.outline,
                    extruded_height: style.extruded_height,
                }));
            }
        }
        LayerKind::Line => {
            let color = color_or(resolve(def.paint_expr(&["line-color"]), props), DEFAULT_LINE_COLOR);
            let width = number_or(
                resolve(def.paint_expr(&["line-width"]), props),
                DEFAULT_LINE_WIDTH,
            );
            for ring in geometry.outer_rings() {
                out.push(Primitive::Polyline(PolylinePrimitive {
                    positions: ring.iter().map(|p| p.to_cartesian(0.0)).collect(),
                    width,
                    material: color,
                }));
            }
        }
        LayerKind::Circle => {
            if let Some(point) = geometry.as_point() {
                out.push(circle(def, props, point));
            }
        }
        LayerKind::Symbol => {
            if let Some(point) = geometry.as_point() {
                out.push(label(def, props, point));
            }
        }
    }
}

struct FillStyle {
    fill: Color,
    outline: Color,
    base: f64,
    extruded_height: Option<f64>,
}

impl FillStyle {
    fn resolve(def: &LayerDef, props: &Map<String, Value>) -> Self {
        let extruded = def.kind == LayerKind::FillExtrusion;
        let (color_keys, opacity_keys): (&[&str], &[&str]) = if extruded {
            (
                &["fill-extrusion-color", "fill-color"],
                &["fill-extrusion-opacity", "fill-opacity"],
            )
        } else {
            (&["fill-color"], &["fill-opacity"])
        };

        let fill = color_or(resolve(def.paint_expr(color_keys), props), DEFAULT_FILL_COLOR);
        let alpha = number_or(resolve(def.paint_expr(opacity_keys), props), DEFAULT_FILL_OPACITY);
        let outline = color_or(
            resolve(def.paint_expr(&["fill-outline-color"]), props),
            DEFAULT_OUTLINE_COLOR,
        );
        let height = number_or(resolve(def.paint_expr(&["fill-extrusion-height"]), props), 0.0);
        let base = number_or(resolve(def.paint_expr(&["fill-extrusion-base"]), props), 0.0);

        let outline_alpha = if extruded {
            EXTRUSION_OUTLINE_ALPHA
        } else {
            FILL_OUTLINE_ALPHA
        };
        Self {
            fill: fill.with_alpha(alpha as f32),
            outline: outline.with_alpha(outline_alpha),
            base,
            extruded_height: extruded.then_some(height),
        }
    }
}

fn circle(def: &LayerDef, props: &Map<String, Value>, point: GeoPoint) -> Primitive {
    Primitive::Point(PointPrimitive {
        position: point.to_cartesian(0.0),
        pixel_size: number_or(
            resolve(def.paint_expr(&["circle-radius"]), props),
            DEFAULT_CIRCLE_RADIUS,
        ),
        color: color_or(
            resolve(def.paint_expr(&["circle-color"]), props),
            DEFAULT_CIRCLE_COLOR,
        ),
        outline_color: color_or(
            resolve(def.paint_expr(&["circle-stroke-color"]), props),
            DEFAULT_CIRCLE_STROKE_COLOR,
        ),
        outline_width: number_or(
            resolve(def.paint_expr(&["circle-stroke-width"]), props),
            DEFAULT_CIRCLE_STROKE_WIDTH,
        ),
    })
}

fn label(def: &LayerDef, props: &Map<String, Value>, point: GeoPoint) -> Primitive {
    let text = display_string(resolve(def.layout_expr("text-field"), props).as_ref());
    let size = number_or(resolve(def.layout_expr("text-size"), props), DEFAULT_TEXT_SIZE);
    Primitive::Label(LabelPrimitive {
        position: point.to_cartesian(0.0),
        text,
        font: format!("{size}px sans-serif"),
        fill_color: color_or(
            resolve(def.paint_expr(&["text-color"]), props),
            DEFAULT_TEXT_COLOR,
        ),
        vertical_origin: VerticalOrigin::Bottom,
        pixel_offset: LABEL_PIXEL_OFFSET,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_CIRCLE_COLOR, DEFAULT_FILL_COLOR, DEFAULT_TEXT_COLOR, EXTRUSION_OUTLINE_ALPHA,
        build_primitives,
    };
    use crate::style::{LayerDef, LayerKind};
    use formats::FeatureCollection;
    use foundation::math::cartographic_from_cartesian;
    use scene::{Color, Primitive, VerticalOrigin};
    use serde_json::json;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn collection(v: serde_json::Value) -> FeatureCollection {
        FeatureCollection::from_geojson_value(&v).expect("collection")
    }

    fn square() -> FeatureCollection {
        collection(json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"h": 12, "name": "Lot 4"},
             "geometry": {"type": "Polygon", "coordinates": [
                [[5.0, 52.0], [5.001, 52.0], [5.001, 52.001], [5.0, 52.0]]
             ]}}
        ]}))
    }

    #[test]
    fn fill_color_with_default_opacity() {
        let def = LayerDef::new("plots", LayerKind::Fill, "s").with_paint("fill-color", json!("#112233"));
        let prims = build_primitives(&def, &square());
        assert_eq!(prims.len(), 1);
        let Primitive::Polygon(poly) = &prims[0] else {
            panic!("expected polygon, got {:?}", prims[0]);
        };
        assert_eq!(poly.material, Color::from_rgba8(0x11, 0x22, 0x33, 255).with_alpha(0.22));
        assert_eq!(poly.hierarchy.len(), 4);
        assert_eq!(poly.extruded_height, None);
        assert_eq!(poly.outline_color, Color::BLACK.with_alpha(0.8));
    }

    #[test]
    fn fill_defaults_when_paint_is_missing_or_broken() {
        let def = LayerDef::new("plots", LayerKind::Fill, "s")
            .with_paint("fill-color", json!(["get", "missing"]))
            .with_paint("fill-opacity", json!(["interpolate", 1]));
        let prims = build_primitives(&def, &square());
        let Primitive::Polygon(poly) = &prims[0] else {
            panic!("expected polygon");
        };
        assert_eq!(poly.material, DEFAULT_FILL_COLOR.with_alpha(0.22));
    }

    #[test]
    fn extrusion_resolves_height_base_and_color_fallback() {
        let def = LayerDef::new("b", LayerKind::FillExtrusion, "s")
            .with_paint("fill-color", json!("#ffffff"))
            .with_paint("fill-extrusion-height", json!(["get", "h"]))
            .with_paint("fill-extrusion-base", json!(3))
            .with_paint("fill-extrusion-opacity", json!(0.6));
        let prims = build_primitives(&def, &square());
        let Primitive::Polygon(poly) = &prims[0] else {
            panic!("expected polygon");
        };
        assert_eq!(poly.extruded_height, Some(12.0));
        assert_eq!(poly.material, Color::WHITE.with_alpha(0.6));
        assert_eq!(poly.outline_color, Color::BLACK.with_alpha(EXTRUSION_OUTLINE_ALPHA));
        let (_, h) = cartographic_from_cartesian(poly.hierarchy[0]);
        assert_close(h, 3.0, 1e-6);
    }

    #[test]
    fn multipolygon_yields_one_ring_per_part() {
        let fc = collection(json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[4.0, 51.0], [4.1, 51.0], [4.1, 51.1], [4.0, 51.0]],
                 [[4.02, 51.02], [4.03, 51.02], [4.03, 51.03], [4.02, 51.02]]],
                [[[4.5, 51.5], [4.6, 51.5], [4.6, 51.6], [4.5, 51.5]]]
             ]}}
        ]}));
        let def = LayerDef::new("edges", LayerKind::Line, "s").with_paint("line-width", json!(3));
        let prims = build_primitives(&def, &fc);
        assert_eq!(prims.len(), 2);
        assert!(prims.iter().all(|p| matches!(p, Primitive::Polyline(l) if l.width == 3.0)));
    }

    #[test]
    fn points_only_draw_for_point_geometries() {
        let fc = collection(json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "A", "no": 7},
             "geometry": {"type": "Point", "coordinates": [5.3, 52.2]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}
        ]}));

        let circles = build_primitives(&LayerDef::new("c", LayerKind::Circle, "s"), &fc);
        assert_eq!(circles.len(), 1);
        let Primitive::Point(p) = &circles[0] else {
            panic!("expected point");
        };
        assert_eq!(p.pixel_size, 6.0);
        assert_eq!(p.color, DEFAULT_CIRCLE_COLOR);

        let def = LayerDef::new("l", LayerKind::Symbol, "s")
            .with_layout("text-field", json!(["concat", ["get", "name"], "-", ["get", "no"]]))
            .with_layout("text-size", json!(14));
        let labels = build_primitives(&def, &fc);
        assert_eq!(labels.len(), 1);
        let Primitive::Label(l) = &labels[0] else {
            panic!("expected label");
        };
        assert_eq!(l.text, "A-7");
        assert_eq!(l.font, "14px sans-serif");
        assert_eq!(l.fill_color, DEFAULT_TEXT_COLOR);
        assert_eq!(l.vertical_origin, VerticalOrigin::Bottom);
    }

    #[test]
    fn label_without_text_field_is_empty() {
        let fc = collection(json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [5.3, 52.2]}}
        ]}));
        let labels = build_primitives(&LayerDef::new("l", LayerKind::Symbol, "s"), &fc);
        let Primitive::Label(l) = &labels[0] else {
            panic!("expected label");
        };
        assert_eq!(l.text, "");
        assert_eq!(l.font, "12px sans-serif");
    }
}
