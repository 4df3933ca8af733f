use thiserror::Error;

use crate::map::coordinates::WGS84Coordinate;
use crate::map::geometry::{Shape, ShapeKind, closed_ring, is_closed_ring, ring_vertex_count};
use crate::map::style::Color;
use crate::map::surface::{
  FillLayerSpec, LineLayerSpec, MapSurface, MarkerId, MarkerKind, MarkerSpec,
};
use crate::repository::{RepositoryError, SpatialData, SpatialDataPatch, SpatialRepository};

pub const PREVIEW_SOURCE: &str = "edit-preview";
pub const PREVIEW_FILL: &str = "edit-preview-fill";
pub const PREVIEW_OUTLINE: &str = "edit-preview-outline";

/// Distinct vertices a polygon needs before it can be saved.
pub const MIN_POLYGON_VERTICES: usize = 3;

#[derive(Error, Debug)]
pub enum EditError {
  #[error("a polygon needs at least {MIN_POLYGON_VERTICES} vertices")]
  TooFewVertices,
  #[error("the edited row has no position")]
  MissingPosition,
  #[error("saving failed: {0}")]
  Repository(#[from] RepositoryError),
}

/// One active edit of a point or a polygon.
///
/// Holds the untouched snapshot and a working copy; nothing reaches the
/// repository until [`EditSession::save`]. All surface artifacts the session
/// creates (vertex handles, preview layers) are removed by
/// [`EditSession::teardown`], which runs on save and cancel alike.
pub struct EditSession {
  original: SpatialData,
  working: SpatialData,
  shape: Shape,
  handles: Vec<MarkerId>,
  preview: bool,
  color: Color,
  fill_alpha: u8,
}

impl EditSession {
  /// Starts editing a point row. The row's rendered marker stays in place;
  /// its drags are routed into [`EditSession::set_position`].
  #[must_use]
  pub fn open_point(data: SpatialData) -> Option<Self> {
    let shape = Shape::resolve(&data)?;
    matches!(shape, Shape::Point(_)).then(|| Self {
      original: data.clone(),
      working: data,
      shape,
      handles: Vec::new(),
      preview: false,
      color: Color::default(),
      fill_alpha: 0,
    })
  }

  /// Starts editing a polygon row: one draggable handle per distinct ring
  /// vertex (the closing duplicate gets none) plus a live preview layer in
  /// the collection's color.
  #[must_use]
  pub fn open_polygon(
    data: SpatialData,
    surface: &mut dyn MapSurface,
    color: Color,
    fill_alpha: u8,
  ) -> Option<Self> {
    let shape = Shape::resolve(&data)?;
    let Shape::Polygon(ring) = &shape else {
      return None;
    };

    let handles = ring[..ring_vertex_count(ring)]
      .iter()
      .map(|position| {
        surface.add_marker(
          MarkerSpec::new(*position, color.to_rgb())
            .with_kind(MarkerKind::VertexHandle)
            .draggable(true),
        )
      })
      .collect();

    let mut session = Self {
      original: data.clone(),
      working: data,
      shape,
      handles,
      preview: false,
      color,
      fill_alpha,
    };
    session.refresh_preview(surface);
    Some(session)
  }

  #[must_use]
  pub fn id(&self) -> &str {
    &self.original.id
  }

  #[must_use]
  pub fn collection_id(&self) -> &str {
    &self.original.collection_id
  }

  #[must_use]
  pub fn kind(&self) -> ShapeKind {
    self.shape.kind()
  }

  #[must_use]
  pub fn working(&self) -> &SpatialData {
    &self.working
  }

  #[must_use]
  pub fn original(&self) -> &SpatialData {
    &self.original
  }

  #[must_use]
  pub fn handles(&self) -> &[MarkerId] {
    &self.handles
  }

  pub fn set_name(&mut self, name: &str) {
    self.working.name = name.to_string();
  }

  pub fn set_description(&mut self, description: &str) {
    self.working.description = Some(description.to_string());
  }

  pub fn set_category(&mut self, category: &str) {
    self.working.category = Some(category.to_string());
  }

  pub fn set_address(&mut self, address: &str) {
    self.working.address = Some(address.to_string());
  }

  /// Moves the edited point, keeping the flat fields and the working shape
  /// in sync. Ignored for polygon sessions.
  pub fn set_position(&mut self, position: WGS84Coordinate) {
    if let Shape::Point(coord) = &mut self.shape {
      *coord = position;
      self.working.latitude = Some(position.lat);
      self.working.longitude = Some(position.lon);
    }
  }

  /// Routes a vertex handle drag. Returns false if the marker is not one of
  /// this session's handles. Dragging the handle of the first vertex also
  /// rewrites the closing duplicate so the ring stays closed.
  pub fn drag_handle(
    &mut self,
    surface: &mut dyn MapSurface,
    handle: MarkerId,
    to: WGS84Coordinate,
  ) -> bool {
    let Some(idx) = self.handles.iter().position(|id| *id == handle) else {
      return false;
    };
    let Shape::Polygon(ring) = &mut self.shape else {
      return false;
    };
    let closed = is_closed_ring(ring);
    ring[idx] = to;
    if idx == 0 && closed {
      let last = ring.len() - 1;
      ring[last] = to;
    }
    self.refresh_preview(surface);
    true
  }

  /// Validates the working copy and persists it. On failure the session
  /// stays open with the working copy intact so the user can retry.
  ///
  /// # Errors
  /// [`EditError::TooFewVertices`] and [`EditError::MissingPosition`] are
  /// rejected before any repository call; [`EditError::Repository`] wraps a
  /// failed write.
  pub async fn save(
    &mut self,
    repository: &dyn SpatialRepository,
  ) -> Result<SpatialData, EditError> {
    let patch = self.build_patch()?;
    let saved = repository
      .update_spatial_data(&self.original.id, patch)
      .await?;
    self.working = saved.clone();
    Ok(saved)
  }

  /// Removes every surface artifact this session created.
  pub fn teardown(&mut self, surface: &mut dyn MapSurface) {
    for handle in self.handles.drain(..) {
      surface.remove_marker(handle);
    }
    if self.preview {
      surface.remove_layer(PREVIEW_FILL);
      surface.remove_layer(PREVIEW_OUTLINE);
      surface.remove_source(PREVIEW_SOURCE);
      self.preview = false;
    }
  }

  fn build_patch(&self) -> Result<SpatialDataPatch, EditError> {
    let mut patch = SpatialDataPatch {
      name: Some(self.working.name.clone()),
      description: self.working.description.clone(),
      category: self.working.category.clone(),
      address: self.working.address.clone(),
      ..SpatialDataPatch::default()
    };
    match &self.shape {
      Shape::Point(position) => {
        if !position.is_valid() {
          return Err(EditError::MissingPosition);
        }
        patch.latitude = Some(position.lat);
        patch.longitude = Some(position.lon);
        patch.geometry = Some(self.shape.to_wire());
        patch.geometry_type = Some(ShapeKind::Point.tag().to_string());
      }
      Shape::Polygon(ring) => {
        if ring_vertex_count(ring) < MIN_POLYGON_VERTICES {
          return Err(EditError::TooFewVertices);
        }
        patch.geometry = Some(Shape::Polygon(closed_ring(ring)).to_wire());
        patch.geometry_type = Some(ShapeKind::Polygon.tag().to_string());
      }
    }
    Ok(patch)
  }

  fn refresh_preview(&mut self, surface: &mut dyn MapSurface) {
    if self.preview {
      surface.remove_layer(PREVIEW_FILL);
      surface.remove_layer(PREVIEW_OUTLINE);
      surface.remove_source(PREVIEW_SOURCE);
    }
    let wire = self.shape.to_wire();
    surface.add_source(
      PREVIEW_SOURCE,
      serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
          "type": "Feature",
          "id": self.working.id,
          "properties": {},
          "geometry": {"type": wire.kind, "coordinates": wire.coordinates},
        }],
      }),
    );
    surface.add_fill_layer(FillLayerSpec {
      id: PREVIEW_FILL.to_string(),
      source_id: PREVIEW_SOURCE.to_string(),
      color: self.color.to_rgba(self.fill_alpha),
    });
    surface.add_line_layer(LineLayerSpec {
      id: PREVIEW_OUTLINE.to_string(),
      source_id: PREVIEW_SOURCE.to_string(),
      color: self.color.to_rgb(),
      width: 2.0,
      dash: None,
    });
    self.preview = true;
  }
}
