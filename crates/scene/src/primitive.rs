use foundation::math::{Vec2, Vec3};

use crate::color::Color;

/// Engine-owned collection of primitives that is cleared and refilled as a unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Polygon,
    Polyline,
    Point,
    Label,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum VerticalOrigin {
    #[default]
    Center,
    Bottom,
    Top,
}

/// Filled polygon over an outer ring, optionally extruded upwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonPrimitive {
    pub hierarchy: Vec<Vec3>,
    pub material: Color,
    pub outline: bool,
    pub outline_color: Color,
    pub extruded_height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylinePrimitive {
    pub positions: Vec<Vec3>,
    pub width: f64,
    pub material: Color,
}

/// Screen-space sized dot.
#[derive(Debug, Clone, PartialEq)]
pub struct PointPrimitive {
    pub position: Vec3,
    pub pixel_size: f64,
    pub color: Color,
    pub outline_color: Color,
    pub outline_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPrimitive {
    pub position: Vec3,
    pub text: String,
    pub font: String,
    pub fill_color: Color,
    pub vertical_origin: VerticalOrigin,
    pub pixel_offset: Vec2,
}

/// Drawable handed to the engine. Positions are Earth-fixed (ECEF) meters.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Polygon(PolygonPrimitive),
    Polyline(PolylinePrimitive),
    Point(PointPrimitive),
    Label(LabelPrimitive),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Polygon(_) => PrimitiveKind::Polygon,
            Primitive::Polyline(_) => PrimitiveKind::Polyline,
            Primitive::Point(_) => PrimitiveKind::Point,
            Primitive::Label(_) => PrimitiveKind::Label,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        match self {
            Primitive::Polygon(p) => &p.hierarchy,
            Primitive::Polyline(p) => &p.positions,
            Primitive::Point(p) => std::slice::from_ref(&p.position),
            Primitive::Label(p) => std::slice::from_ref(&p.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PointPrimitive, Primitive, PrimitiveKind};
    use crate::color::Color;
    use foundation::math::Vec3;

    #[test]
    fn point_exposes_single_position() {
        let p = Primitive::Point(PointPrimitive {
            position: Vec3::new(1.0, 2.0, 3.0),
            pixel_size: 6.0,
            color: Color::WHITE,
            outline_color: Color::BLACK,
            outline_width: 1.0,
        });
        assert_eq!(p.kind(), PrimitiveKind::Point);
        assert_eq!(p.positions(), &[Vec3::new(1.0, 2.0, 3.0)]);
    }
}
