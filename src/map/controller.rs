use std::sync::Arc;

use log::warn;

use crate::config::EngineConfig;
use crate::map::edit::{EditError, EditSession};
use crate::map::geometry::{Shape, ShapeKind};
use crate::map::layer_tree::LayerTree;
use crate::map::measure::MeasureSession;
use crate::map::reconciler::RenderReconciler;
use crate::map::style::collection_color;
use crate::map::coordinates::WGS84Coordinate;
use crate::map::surface::{MapSurface, MarkerId, PopupContent, SurfaceEvent};
use crate::repository::{RepositoryError, SpatialData, SpatialDataPatch, SpatialRepository};

/// What currently owns interactive input on the map surface. Editing and
/// measuring are mutually exclusive by construction.
pub enum InteractionMode {
  Idle,
  Editing(EditSession),
  Measuring(MeasureSession),
}

/// Owns the layer tree, the reconciler and the interaction mode, and routes
/// every surface event. All repository I/O goes through here; suspension
/// points exist nowhere else, so tree mutations and re-renders happen
/// strictly in event order.
pub struct MapController {
  repository: Arc<dyn SpatialRepository>,
  surface: Box<dyn MapSurface>,
  config: EngineConfig,
  tree: LayerTree,
  reconciler: RenderReconciler,
  mode: InteractionMode,
}

impl MapController {
  #[must_use]
  pub fn new(
    repository: Arc<dyn SpatialRepository>,
    surface: Box<dyn MapSurface>,
    config: EngineConfig,
  ) -> Self {
    let reconciler = RenderReconciler::new(config.fill_alpha());
    Self {
      repository,
      surface,
      config,
      tree: LayerTree::default(),
      reconciler,
      mode: InteractionMode::Idle,
    }
  }

  /// Fetches all projects and their collections and builds a fresh tree.
  /// Points stay unloaded until a collection is shown or expanded.
  ///
  /// # Errors
  /// Propagates the repository failure; the previous tree stays in place.
  pub async fn load_projects(&mut self) -> Result<(), RepositoryError> {
    let projects = self.repository.list_projects().await?;
    let mut parts = Vec::with_capacity(projects.len());
    for project in projects {
      let collections = self.repository.list_collections(&project.id).await?;
      parts.push((project, collections));
    }
    self.tree = LayerTree::from_parts(parts);
    self.render();
    Ok(())
  }

  #[must_use]
  pub fn tree(&self) -> &LayerTree {
    &self.tree
  }

  #[must_use]
  pub fn mode(&self) -> &InteractionMode {
    &self.mode
  }

  #[must_use]
  pub fn is_editing(&self) -> bool {
    matches!(self.mode, InteractionMode::Editing(_))
  }

  #[must_use]
  pub fn is_measuring(&self) -> bool {
    matches!(self.mode, InteractionMode::Measuring(_))
  }

  #[must_use]
  pub fn edit_session(&self) -> Option<&EditSession> {
    match &self.mode {
      InteractionMode::Editing(session) => Some(session),
      _ => None,
    }
  }

  pub fn edit_session_mut(&mut self) -> Option<&mut EditSession> {
    match &mut self.mode {
      InteractionMode::Editing(session) => Some(session),
      _ => None,
    }
  }

  pub fn toggle_project_visible(&mut self, project_id: &str) {
    self.tree = std::mem::take(&mut self.tree).toggle_project_visible(project_id);
    self.render();
  }

  pub fn toggle_project_expanded(&mut self, project_id: &str) {
    self.tree = std::mem::take(&mut self.tree).toggle_project_expanded(project_id);
  }

  /// Flips a collection's visible flag. The flag flips synchronously; a
  /// collection turning visible whose points were never fetched triggers
  /// the one lazy load before the re-render.
  pub async fn toggle_collection_visible(&mut self, project_id: &str, collection_id: &str) {
    self.tree =
      std::mem::take(&mut self.tree).toggle_collection_visible(project_id, collection_id);
    let wants_points = self
      .tree
      .collection(collection_id)
      .is_some_and(|node| node.visible);
    if wants_points {
      self.ensure_points_loaded(collection_id).await;
    }
    self.render();
  }

  /// Expanding a collection lazy-loads its points exactly like making it
  /// visible does, independently of visibility.
  pub async fn toggle_collection_expanded(&mut self, project_id: &str, collection_id: &str) {
    self.tree =
      std::mem::take(&mut self.tree).toggle_collection_expanded(project_id, collection_id);
    let wants_points = self
      .tree
      .collection(collection_id)
      .is_some_and(|node| node.expanded);
    if wants_points {
      self.ensure_points_loaded(collection_id).await;
    }
    self.render();
  }

  /// Routes a surface event according to the current interaction mode.
  ///
  /// # Errors
  /// Only a drag-end commit reaches the repository here; its failure is
  /// surfaced and leaves the previous state intact.
  pub async fn handle_event(&mut self, event: SurfaceEvent) -> Result<(), RepositoryError> {
    match event {
      SurfaceEvent::MapClick(at) => {
        if let InteractionMode::Measuring(session) = &mut self.mode {
          session.add_point(&mut *self.surface, at);
        }
      }
      SurfaceEvent::MarkerClicked(id) => {
        if matches!(self.mode, InteractionMode::Idle) && !self.config.read_only()
          && let Some(binding) = self.reconciler.binding(id).cloned()
        {
          self.open_edit_session(&binding.spatial_id);
        }
      }
      SurfaceEvent::MarkerDragged { id, to } | SurfaceEvent::MarkerDragEnd { id, to }
        if self.is_editing() =>
      {
        self.route_edit_drag(id, to);
      }
      SurfaceEvent::MarkerDragged { .. } => {}
      SurfaceEvent::MarkerDragEnd { id, to } => {
        if matches!(self.mode, InteractionMode::Idle)
          && let Some(binding) = self.reconciler.binding(id).cloned()
        {
          self.commit_marker_position(&binding.spatial_id, &binding.collection_id, to)
            .await?;
        }
      }
      SurfaceEvent::LayerClicked {
        layer_id,
        feature_id,
        at,
      } => {
        if RenderReconciler::collection_of_fill_layer(&layer_id).is_none() {
          return Ok(());
        }
        if self.config.read_only() {
          if let Some(data) = self.tree.find_spatial_data(&feature_id) {
            let content = PopupContent::from(data);
            self.surface.show_popup(at, &content);
          }
        } else if matches!(self.mode, InteractionMode::Idle) {
          self.open_edit_session(&feature_id);
        }
      }
    }
    Ok(())
  }

  /// Opens an edit session for a loaded row. A session already active is
  /// discarded without saving; a running measurement is stopped. A row
  /// without editable geometry opens nothing and leaves the active session
  /// in place.
  pub fn open_edit_session(&mut self, spatial_id: &str) -> bool {
    if self.config.read_only() {
      return false;
    }
    let Some(data) = self.tree.find_spatial_data(spatial_id).cloned() else {
      warn!("cannot edit {spatial_id}: not loaded");
      return false;
    };
    let Some(kind) = Shape::resolve(&data).map(|shape| shape.kind()) else {
      warn!("cannot edit {spatial_id}: no editable geometry");
      return false;
    };
    // The active session is only discarded once the row is known to open.
    self.close_current_session();

    let session = match kind {
      ShapeKind::Point => EditSession::open_point(data),
      ShapeKind::Polygon => {
        let color = self
          .tree
          .collection_position(&data.collection_id)
          .map_or_else(Default::default, |(pi, ci)| collection_color(pi, ci));
        EditSession::open_polygon(data, &mut *self.surface, color, self.config.fill_alpha())
      }
    };
    match session {
      Some(session) => {
        self.mode = InteractionMode::Editing(session);
        true
      }
      None => false,
    }
  }

  /// Persists the active edit session. On failure the session stays open
  /// with the working copy intact; on success its artifacts are removed,
  /// the owning collection is reloaded and the map re-rendered.
  ///
  /// # Errors
  /// Validation failures never reach the repository; repository failures
  /// are wrapped in [`EditError::Repository`].
  pub async fn save_edit(&mut self) -> Result<(), EditError> {
    let repository = Arc::clone(&self.repository);
    let InteractionMode::Editing(session) = &mut self.mode else {
      return Ok(());
    };
    session.save(repository.as_ref()).await?;
    let collection_id = session.collection_id().to_string();

    if let InteractionMode::Editing(mut session) =
      std::mem::replace(&mut self.mode, InteractionMode::Idle)
    {
      session.teardown(&mut *self.surface);
    }
    self.reload_points(&collection_id).await;
    self.render();
    Ok(())
  }

  /// Discards the active edit session without touching the repository. The
  /// re-render snaps a dragged marker back to its persisted position.
  pub fn cancel_edit(&mut self) {
    if let InteractionMode::Editing(mut session) =
      std::mem::replace(&mut self.mode, InteractionMode::Idle)
    {
      session.teardown(&mut *self.surface);
      self.render();
    }
  }

  /// Enters measurement mode. An unsaved edit session is discarded.
  pub fn start_measurement(&mut self) {
    if self.is_measuring() {
      return;
    }
    self.close_current_session();
    self.mode = InteractionMode::Measuring(MeasureSession::start(&mut *self.surface));
  }

  /// Leaves measurement mode and removes every measurement primitive.
  pub fn stop_measurement(&mut self) {
    if let InteractionMode::Measuring(session) =
      std::mem::replace(&mut self.mode, InteractionMode::Idle)
    {
      session.stop(&mut *self.surface);
    }
  }

  pub fn toggle_measurement(&mut self) {
    if self.is_measuring() {
      self.stop_measurement();
    } else {
      self.start_measurement();
    }
  }

  /// Creates a row and refreshes its collection.
  ///
  /// # Errors
  /// Propagates the repository failure; nothing is reloaded in that case.
  pub async fn create_spatial_data(
    &mut self,
    data: SpatialData,
  ) -> Result<SpatialData, RepositoryError> {
    let created = self.repository.create_spatial_data(data).await?;
    self.reload_points(&created.collection_id).await;
    self.render();
    Ok(created)
  }

  /// Deletes a row and refreshes its collection.
  ///
  /// # Errors
  /// Propagates the repository failure; nothing is reloaded in that case.
  pub async fn delete_spatial_data(
    &mut self,
    collection_id: &str,
    spatial_id: &str,
  ) -> Result<bool, RepositoryError> {
    let deleted = self.repository.delete_spatial_data(spatial_id).await?;
    self.reload_points(collection_id).await;
    self.render();
    Ok(deleted)
  }

  fn close_current_session(&mut self) {
    match std::mem::replace(&mut self.mode, InteractionMode::Idle) {
      InteractionMode::Editing(mut session) => {
        warn!("discarding unsaved edit of {}", session.id());
        session.teardown(&mut *self.surface);
      }
      InteractionMode::Measuring(session) => session.stop(&mut *self.surface),
      InteractionMode::Idle => {}
    }
  }

  fn route_edit_drag(&mut self, id: MarkerId, to: WGS84Coordinate) {
    let binding = self.reconciler.binding(id).cloned();
    if let InteractionMode::Editing(session) = &mut self.mode {
      if session.drag_handle(&mut *self.surface, id, to) {
        return;
      }
      if binding.is_some_and(|b| b.spatial_id == session.id()) {
        session.set_position(to);
      }
    }
  }

  async fn commit_marker_position(
    &mut self,
    spatial_id: &str,
    collection_id: &str,
    to: WGS84Coordinate,
  ) -> Result<(), RepositoryError> {
    let shape = Shape::Point(to);
    let patch = SpatialDataPatch {
      latitude: Some(to.lat),
      longitude: Some(to.lon),
      geometry: Some(shape.to_wire()),
      geometry_type: Some(ShapeKind::Point.tag().to_string()),
      ..SpatialDataPatch::default()
    };
    self.repository.update_spatial_data(spatial_id, patch).await?;
    self.reload_points(collection_id).await;
    self.render();
    Ok(())
  }

  /// Loads points for a collection that was never fetched. A collection
  /// already holding a load result is left alone.
  async fn ensure_points_loaded(&mut self, collection_id: &str) {
    let needs_load = self
      .tree
      .collection(collection_id)
      .is_some_and(|node| !node.loaded);
    if needs_load {
      self.reload_points(collection_id).await;
    }
  }

  /// Unconditionally refetches a collection's points. A failure keeps the
  /// previous points and is only logged; the tree never crashes over I/O.
  async fn reload_points(&mut self, collection_id: &str) {
    match self.repository.list_spatial_data(collection_id).await {
      Ok(points) => {
        self.tree = std::mem::take(&mut self.tree).with_points(collection_id, points);
      }
      Err(e) => warn!("loading points for collection {collection_id} failed: {e}"),
    }
  }

  fn render(&mut self) {
    self
      .reconciler
      .render(&mut *self.surface, &self.tree, self.config.read_only());
  }
}
