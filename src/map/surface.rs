use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::map::coordinates::WGS84Coordinate;
use crate::map::style::Rgba;
use crate::repository::SpatialData;

/// Handle to a marker created on the surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

/// What a marker is used for. Surfaces may size or shape them differently.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerKind {
  #[default]
  Pin,
  VertexHandle,
  MeasurePoint,
}

/// Info popup content attached to markers and polygon clicks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupContent {
  pub title: String,
  pub description: Option<String>,
  pub category: Option<String>,
  pub address: Option<String>,
  pub image_url: Option<String>,
}

impl From<&SpatialData> for PopupContent {
  fn from(data: &SpatialData) -> Self {
    Self {
      title: data.name.clone(),
      description: data.description.clone(),
      category: data.category.clone(),
      address: data.address.clone(),
      image_url: data.image_url.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
  pub position: WGS84Coordinate,
  pub color: Rgba,
  pub kind: MarkerKind,
  pub draggable: bool,
  pub label: Option<String>,
  pub popup: Option<PopupContent>,
}

impl MarkerSpec {
  #[must_use]
  pub fn new(position: WGS84Coordinate, color: Rgba) -> Self {
    Self {
      position,
      color,
      kind: MarkerKind::Pin,
      draggable: false,
      label: None,
      popup: None,
    }
  }

  #[must_use]
  pub fn with_kind(mut self, kind: MarkerKind) -> Self {
    self.kind = kind;
    self
  }

  #[must_use]
  pub fn draggable(mut self, draggable: bool) -> Self {
    self.draggable = draggable;
    self
  }

  #[must_use]
  pub fn with_label(mut self, label: String) -> Self {
    self.label = Some(label);
    self
  }

  #[must_use]
  pub fn with_popup(mut self, popup: PopupContent) -> Self {
    self.popup = Some(popup);
    self
  }
}

/// Translucent fill over a GeoJSON source.
#[derive(Debug, Clone, PartialEq)]
pub struct FillLayerSpec {
  pub id: String,
  pub source_id: String,
  pub color: Rgba,
}

/// Stroke over a GeoJSON source, optionally dashed.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayerSpec {
  pub id: String,
  pub source_id: String,
  pub color: Rgba,
  pub width: f32,
  pub dash: Option<(f32, f32)>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CursorStyle {
  #[default]
  Default,
  Crosshair,
}

/// The single map surface instance the engine draws on. Implementations
/// wrap whatever native map widget the host application embeds.
pub trait MapSurface {
  fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId;
  fn remove_marker(&mut self, id: MarkerId);
  /// Adds a GeoJSON source keyed by id. `data` is a FeatureCollection.
  fn add_source(&mut self, id: &str, data: Value);
  fn remove_source(&mut self, id: &str);
  fn add_fill_layer(&mut self, spec: FillLayerSpec);
  fn add_line_layer(&mut self, spec: LineLayerSpec);
  fn remove_layer(&mut self, id: &str);
  fn set_cursor(&mut self, cursor: CursorStyle);
  fn show_popup(&mut self, at: WGS84Coordinate, content: &PopupContent);
}

/// User interaction reported back by the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
  MapClick(WGS84Coordinate),
  MarkerClicked(MarkerId),
  /// Live position update while a marker is being dragged.
  MarkerDragged { id: MarkerId, to: WGS84Coordinate },
  MarkerDragEnd { id: MarkerId, to: WGS84Coordinate },
  /// Click on a fill layer; `feature_id` is the spatial data id baked into
  /// the FeatureCollection.
  LayerClicked {
    layer_id: String,
    feature_id: String,
    at: WGS84Coordinate,
  },
}
