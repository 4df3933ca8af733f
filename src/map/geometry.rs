use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::map::coordinates::WGS84Coordinate;
use crate::repository::SpatialData;

/// GeoJSON-shaped geometry as stored by the backend. `coordinates` stays a
/// raw JSON value until it is resolved into a [`Shape`] at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireGeometry {
  #[serde(rename = "type", default)]
  pub kind: String,
  pub coordinates: Value,
}

/// The two geometry kinds this engine renders. Legacy rows may carry other
/// tags (`line`, `circle`); those never produce a shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeKind {
  Point,
  Polygon,
}

impl ShapeKind {
  /// The advisory tag value written alongside the geometry.
  #[must_use]
  pub fn tag(self) -> &'static str {
    match self {
      ShapeKind::Point => "point",
      ShapeKind::Polygon => "polygon",
    }
  }

  #[must_use]
  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag.to_lowercase().as_str() {
      "point" => Some(ShapeKind::Point),
      "polygon" => Some(ShapeKind::Polygon),
      _ => None,
    }
  }
}

/// Resolved geometry of a spatial data row. Constructed once at the
/// repository boundary; downstream code never re-derives the discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
  Point(WGS84Coordinate),
  /// The outer ring, kept exactly as stored (closing duplicate included if
  /// the backend wrote one). Holes are not supported.
  Polygon(Vec<WGS84Coordinate>),
}

impl Shape {
  #[must_use]
  pub fn kind(&self) -> ShapeKind {
    match self {
      Shape::Point(_) => ShapeKind::Point,
      Shape::Polygon(_) => ShapeKind::Polygon,
    }
  }

  /// Resolves the rendered shape of a row.
  ///
  /// `geometry.type` is authoritative; the advisory `geometry_type` tag is
  /// consulted only when the stored geometry is absent. A disagreement
  /// between the two is recovered silently in favor of the geometry.
  #[must_use]
  pub fn resolve(data: &SpatialData) -> Option<Self> {
    if let Some(wire) = &data.geometry
      && !wire.kind.is_empty()
    {
      let shape = Self::from_wire(wire);
      if let (Some(shape), Some(tag)) = (&shape, &data.geometry_type)
        && ShapeKind::from_tag(tag) != Some(shape.kind())
      {
        log::debug!(
          "row {}: geometry_type {tag:?} disagrees with geometry.type {:?}, trusting geometry",
          data.id,
          wire.kind
        );
      }
      return shape;
    }
    match data.geometry_type.as_deref().and_then(ShapeKind::from_tag) {
      Some(ShapeKind::Point) => {
        let (lat, lon) = (data.latitude?, data.longitude?);
        Some(Shape::Point(WGS84Coordinate::new(lat, lon)))
      }
      // A polygon tag without stored coordinates cannot be rendered.
      _ => None,
    }
  }

  /// Parses a wire geometry. Unknown types and malformed coordinates yield
  /// `None` rather than an error; such rows are simply not rendered.
  #[must_use]
  pub fn from_wire(wire: &WireGeometry) -> Option<Self> {
    match wire.kind.as_str() {
      "Point" => parse_position(&wire.coordinates).map(Shape::Point),
      "Polygon" => {
        let rings = wire.coordinates.as_array()?;
        let ring = parse_ring(rings.first()?)?;
        if ring.len() >= 3 {
          Some(Shape::Polygon(ring))
        } else {
          None
        }
      }
      _ => None,
    }
  }

  /// Serializes the shape back to the wire format. Polygon rings are closed
  /// on write even if the working ring was open.
  #[must_use]
  pub fn to_wire(&self) -> WireGeometry {
    match self {
      Shape::Point(coord) => WireGeometry {
        kind: "Point".to_string(),
        coordinates: Value::from(vec![f64::from(coord.lon), f64::from(coord.lat)]),
      },
      Shape::Polygon(ring) => {
        let ring: Vec<Value> = closed_ring(ring)
          .iter()
          .map(|c| Value::from(vec![f64::from(c.lon), f64::from(c.lat)]))
          .collect();
        WireGeometry {
          kind: "Polygon".to_string(),
          coordinates: Value::from(vec![Value::from(ring)]),
        }
      }
    }
  }
}

/// Whether a ring's first and last coordinate are bit-identical.
#[must_use]
pub fn is_closed_ring(ring: &[WGS84Coordinate]) -> bool {
  match (ring.first(), ring.last()) {
    (Some(first), Some(last)) => ring.len() >= 2 && first.exact_eq(last),
    _ => false,
  }
}

/// Number of distinct vertices, not counting a closing duplicate.
#[must_use]
pub fn ring_vertex_count(ring: &[WGS84Coordinate]) -> usize {
  if is_closed_ring(ring) {
    ring.len() - 1
  } else {
    ring.len()
  }
}

/// Returns the ring with the closing duplicate appended if it was open.
#[must_use]
pub fn closed_ring(ring: &[WGS84Coordinate]) -> Vec<WGS84Coordinate> {
  let mut closed = ring.to_vec();
  if !is_closed_ring(&closed)
    && let Some(first) = closed.first().copied()
  {
    closed.push(first);
  }
  closed
}

#[allow(clippy::cast_possible_truncation)]
fn parse_position(value: &Value) -> Option<WGS84Coordinate> {
  let position = value.as_array()?;
  let lon = position.first()?.as_f64()? as f32;
  let lat = position.get(1)?.as_f64()? as f32;
  Some(WGS84Coordinate::new(lat, lon))
}

fn parse_ring(value: &Value) -> Option<Vec<WGS84Coordinate>> {
  value.as_array()?.iter().map(parse_position).collect()
}
