//! Labeled-geometry collections: GeoJSON `FeatureCollection`s limited to the
//! geometry types the layer renderer draws.

use foundation::math::GeoPoint;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered lon/lat boundary of a polygon.
pub type Ring = Vec<GeoPoint>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
    /// A valid GeoJSON geometry type this crate does not draw; kept by name.
    Other(String),
}

impl Geometry {
    pub fn type_name(&self) -> &str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::Other(name) => name,
        }
    }

    /// Outer rings only; holes are dropped and multi-polygons are flattened.
    pub fn outer_rings(&self) -> Vec<&Ring> {
        match self {
            Geometry::Polygon(rings) => rings.first().into_iter().collect(),
            Geometry::MultiPolygon(polys) => polys.iter().filter_map(|p| p.first()).collect(),
            Geometry::Point(_) | Geometry::Other(_) => Vec::new(),
        }
    }

    pub fn as_point(&self) -> Option<GeoPoint> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            id: None,
            properties,
            geometry: Some(geometry),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionError::Json(msg) => write!(f, "JSON parse error: {msg}"),
            CollectionError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            CollectionError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for CollectionError {}

impl FeatureCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, CollectionError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| CollectionError::Json(e.to_string()))?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, CollectionError> {
        let obj = value
            .as_object()
            .ok_or(CollectionError::NotAFeatureCollection)?;
        if obj.get("type").and_then(|v| v.as_str()) != Some("FeatureCollection") {
            return Err(CollectionError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(CollectionError::NotAFeatureCollection)?;

        let features = features_val
            .iter()
            .enumerate()
            .map(|(index, v)| {
                parse_feature(v).map_err(|reason| CollectionError::InvalidFeature { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { features })
    }

    pub fn to_geojson_value(&self) -> Value {
        let features = self.features.iter().map(feature_to_value).collect();
        let mut root = Map::new();
        root.insert("type".to_string(), Value::from("FeatureCollection"));
        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }
}

impl TryFrom<Value> for FeatureCollection {
    type Error = CollectionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_geojson_value(&value)
    }
}

impl From<FeatureCollection> for Value {
    fn from(fc: FeatureCollection) -> Self {
        fc.to_geojson_value()
    }
}

fn parse_feature(value: &Value) -> Result<Feature, String> {
    let obj = value.as_object().ok_or("feature must be an object")?;
    match obj.get("type").and_then(|v| v.as_str()) {
        Some("Feature") => {}
        Some(other) => return Err(format!("unexpected feature type: {other}")),
        None => return Err("feature missing type".to_string()),
    }

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let properties = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    let geometry = match obj.get("geometry") {
        None | Some(Value::Null) => None,
        Some(g) => Some(parse_geometry(g)?),
    };

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value.as_object().ok_or("geometry must be an object")?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type")?;

    let coords = || obj.get("coordinates").ok_or("geometry missing coordinates");
    match ty {
        "Point" => Ok(Geometry::Point(parse_point(coords()?)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords()?)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_multi_polygon(coords()?)?)),
        "MultiPoint" | "LineString" | "MultiLineString" | "GeometryCollection" => {
            Ok(Geometry::Other(ty.to_string()))
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("Point coordinates must be an array")?;
    if arr.len() < 2 {
        return Err("Point coordinates must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number")?;
    let lat = arr[1].as_f64().ok_or("lat must be a number")?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords.as_array().ok_or("ring must be an array")?;
    arr.iter().map(parse_point).collect()
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings")?;
    rings.iter().map(parse_ring).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons")?;
    polys.iter().map(parse_polygon).collect()
}

fn feature_to_value(feat: &Feature) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::from("Feature"));
    if let Some(id) = &feat.id {
        obj.insert("id".to_string(), Value::String(id.clone()));
    }
    obj.insert(
        "properties".to_string(),
        Value::Object(feat.properties.clone()),
    );
    let geometry = match &feat.geometry {
        Some(Geometry::Point(p)) => geometry_value("Point", point_coords(p)),
        Some(Geometry::Polygon(rings)) => geometry_value("Polygon", rings_coords(rings)),
        Some(Geometry::MultiPolygon(polys)) => geometry_value(
            "MultiPolygon",
            Value::Array(polys.iter().map(|p| rings_coords(p)).collect()),
        ),
        // Unsupported geometries are not carried through.
        Some(Geometry::Other(_)) | None => Value::Null,
    };
    obj.insert("geometry".to_string(), geometry);
    Value::Object(obj)
}

fn geometry_value(ty: &str, coordinates: Value) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::from(ty));
    obj.insert("coordinates".to_string(), coordinates);
    Value::Object(obj)
}

fn point_coords(p: &GeoPoint) -> Value {
    Value::Array(vec![Value::from(p.lon_deg), Value::from(p.lat_deg)])
}

fn rings_coords(rings: &[Ring]) -> Value {
    Value::Array(
        rings
            .iter()
            .map(|ring| Value::Array(ring.iter().map(point_coords).collect()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::{CollectionError, FeatureCollection, Geometry};
    use foundation::math::GeoPoint;
    use serde_json::json;

    const PARCELS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 3, "properties": {"name": "A"},
             "geometry": {"type": "Polygon", "coordinates": [
                [[5.0, 52.0], [5.1, 52.0], [5.1, 52.1], [5.0, 52.0]],
                [[5.02, 52.02], [5.03, 52.02], [5.03, 52.03], [5.02, 52.02]]
             ]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[4.0, 51.0], [4.1, 51.0], [4.1, 51.1], [4.0, 51.0]]],
                [[[4.5, 51.5], [4.6, 51.5], [4.6, 51.6], [4.5, 51.5]]]
             ]}},
            {"type": "Feature", "properties": {"label": "pin"},
             "geometry": {"type": "Point", "coordinates": [5.3, 52.2]}},
            {"type": "Feature", "properties": {}, "geometry": null}
        ]
    }"#;

    #[test]
    fn parses_supported_geometries() {
        let fc = FeatureCollection::from_geojson_str(PARCELS).expect("parse");
        assert_eq!(fc.len(), 4);
        assert_eq!(fc.features[0].id.as_deref(), Some("3"));
        assert_eq!(
            fc.features[2].geometry.as_ref().and_then(Geometry::as_point),
            Some(GeoPoint::new(5.3, 52.2))
        );
        assert!(fc.features[3].geometry.is_none());
    }

    #[test]
    fn outer_rings_drop_holes_and_flatten_multipolygons() {
        let fc = FeatureCollection::from_geojson_str(PARCELS).expect("parse");
        let polygon = fc.features[0].geometry.as_ref().unwrap();
        assert_eq!(polygon.outer_rings().len(), 1);
        let multi = fc.features[1].geometry.as_ref().unwrap();
        assert_eq!(multi.outer_rings().len(), 2);
        assert!(fc.features[2].geometry.as_ref().unwrap().outer_rings().is_empty());
    }

    #[test]
    fn undrawn_geometry_types_are_kept_by_name() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {},
                "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}]
        });
        let fc = FeatureCollection::from_geojson_value(&value).expect("parse");
        assert_eq!(
            fc.features[0].geometry,
            Some(Geometry::Other("LineString".to_string()))
        );
    }

    #[test]
    fn rejects_non_collections_and_bad_features() {
        assert_eq!(
            FeatureCollection::from_geojson_value(&json!({"type": "Feature"})),
            Err(CollectionError::NotAFeatureCollection)
        );
        let bad = json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1]}}
        ]});
        assert!(matches!(
            FeatureCollection::from_geojson_value(&bad),
            Err(CollectionError::InvalidFeature { index: 0, .. })
        ));
    }

    #[test]
    fn deserializes_through_serde() {
        let fc: FeatureCollection = serde_json::from_str(PARCELS).expect("serde");
        let back = serde_json::to_value(&fc).expect("to value");
        let again = FeatureCollection::from_geojson_value(&back).expect("reparse");
        assert_eq!(again.features[2], fc.features[2]);
    }
}
