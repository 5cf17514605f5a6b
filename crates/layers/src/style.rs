use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use scene::Color;

use crate::expression::eval_expr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    #[serde(rename = "fill")]
    Fill,
    #[serde(rename = "fill-extrusion", alias = "extruded-fill")]
    FillExtrusion,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "circle", alias = "point")]
    Circle,
    #[serde(rename = "symbol", alias = "labeled-point")]
    Symbol,
}

/// Declarative layer definition in slippy-map shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    #[serde(default)]
    pub paint: Map<String, Value>,
    #[serde(default)]
    pub layout: Map<String, Value>,
}

impl LayerDef {
    pub fn new(id: impl Into<String>, kind: LayerKind, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            paint: Map::new(),
            layout: Map::new(),
        }
    }

    pub fn with_paint(mut self, key: &str, value: Value) -> Self {
        self.paint.insert(key.to_string(), value);
        self
    }

    pub fn with_layout(mut self, key: &str, value: Value) -> Self {
        self.layout.insert(key.to_string(), value);
        self
    }

    /// First non-null paint rule among `keys`; later keys are fallbacks.
    pub fn paint_expr(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .find_map(|k| self.paint.get(*k).filter(|v| !v.is_null()))
    }

    pub fn layout_expr(&self, key: &str) -> Option<&Value> {
        self.layout.get(key)
    }
}

/// Evaluates an optional style expression; a missing rule is undefined.
pub fn resolve(expr: Option<&Value>, props: &Map<String, Value>) -> Option<Value> {
    expr.and_then(|e| eval_expr(e, props))
}

/// JavaScript `Number()` coercion with a default for undefined, null and NaN.
pub fn number_or(value: Option<Value>, default: f64) -> f64 {
    let n = match value {
        None | Some(Value::Null) => return default,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::Bool(b)) => f64::from(u8::from(b)),
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() { 0.0 } else { t.parse().unwrap_or(f64::NAN) }
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => f64::NAN,
    };
    if n.is_nan() { default } else { n }
}

/// CSS color from an evaluated value; empty, non-string or unparsable values
/// fall back to `fallback`.
pub fn color_or(value: Option<Value>, fallback: Color) -> Color {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Color::from_css(&s).unwrap_or_else(|| {
            tracing::debug!(color = %s, "unparsable paint color, using default");
            fallback
        }),
        _ => fallback,
    }
}
