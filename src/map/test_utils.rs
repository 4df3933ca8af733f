use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::map::coordinates::WGS84Coordinate;
use crate::map::geometry::{Shape, ShapeKind};
use crate::map::surface::{
  CursorStyle, FillLayerSpec, LineLayerSpec, MapSurface, MarkerId, MarkerSpec, PopupContent,
};
use crate::repository::{
  Collection, Project, RepositoryError, SpatialData, SpatialDataPatch, SpatialRepository,
};

#[must_use]
pub fn project(id: &str) -> Project {
  Project {
    id: id.to_string(),
    name: format!("project {id}"),
    description: None,
    show_on_general_map: true,
    created_at: None,
    updated_at: None,
  }
}

#[must_use]
pub fn collection(id: &str, project_id: &str) -> Collection {
  Collection {
    id: id.to_string(),
    project_id: project_id.to_string(),
    name: format!("collection {id}"),
    description: None,
    created_at: None,
    updated_at: None,
  }
}

/// A consistent point row: geometry, advisory tag and flat fields agree.
#[must_use]
pub fn point(id: &str, collection_id: &str, lat: f32, lon: f32) -> SpatialData {
  let mut data = SpatialData::new(id, collection_id, format!("point {id}").as_str());
  let shape = Shape::Point(WGS84Coordinate::new(lat, lon));
  data.geometry = Some(shape.to_wire());
  data.geometry_type = Some(ShapeKind::Point.tag().to_string());
  data.latitude = Some(lat);
  data.longitude = Some(lon);
  data
}

/// A consistent polygon row from `(lat, lon)` vertices.
#[must_use]
pub fn polygon(id: &str, collection_id: &str, ring: &[(f32, f32)]) -> SpatialData {
  let mut data = SpatialData::new(id, collection_id, format!("polygon {id}").as_str());
  let ring: Vec<WGS84Coordinate> = ring
    .iter()
    .map(|(lat, lon)| WGS84Coordinate::new(*lat, *lon))
    .collect();
  data.geometry = Some(Shape::Polygon(ring).to_wire());
  data.geometry_type = Some(ShapeKind::Polygon.tag().to_string());
  data
}

#[derive(Default)]
struct RepoState {
  projects: Vec<Project>,
  collections: Vec<Collection>,
  spatial: Vec<SpatialData>,
  load_calls: HashMap<String, usize>,
  updates: Vec<(String, SpatialDataPatch)>,
  fail_loads: bool,
  fail_updates: bool,
}

/// In-memory repository double with call counting and failure injection.
#[derive(Clone, Default)]
pub struct MockRepository {
  state: Arc<Mutex<RepoState>>,
}

impl MockRepository {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn with_project(self, project: Project) -> Self {
    self.state.lock().unwrap().projects.push(project);
    self
  }

  #[must_use]
  pub fn with_collection(self, collection: Collection) -> Self {
    self.state.lock().unwrap().collections.push(collection);
    self
  }

  #[must_use]
  pub fn with_spatial_data(self, data: SpatialData) -> Self {
    self.state.lock().unwrap().spatial.push(data);
    self
  }

  pub fn set_fail_loads(&self, fail: bool) {
    self.state.lock().unwrap().fail_loads = fail;
  }

  pub fn set_fail_updates(&self, fail: bool) {
    self.state.lock().unwrap().fail_updates = fail;
  }

  /// How many times a collection's points were listed.
  #[must_use]
  pub fn load_calls(&self, collection_id: &str) -> usize {
    *self
      .state
      .lock()
      .unwrap()
      .load_calls
      .get(collection_id)
      .unwrap_or(&0)
  }

  #[must_use]
  pub fn updates(&self) -> Vec<(String, SpatialDataPatch)> {
    self.state.lock().unwrap().updates.clone()
  }

  #[must_use]
  pub fn spatial_data(&self, id: &str) -> Option<SpatialData> {
    self
      .state
      .lock()
      .unwrap()
      .spatial
      .iter()
      .find(|data| data.id == id)
      .cloned()
  }
}

#[async_trait]
impl SpatialRepository for MockRepository {
  async fn list_projects(&self) -> Result<Vec<Project>, RepositoryError> {
    Ok(self.state.lock().unwrap().projects.clone())
  }

  async fn list_collections(&self, project_id: &str) -> Result<Vec<Collection>, RepositoryError> {
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .collections
        .iter()
        .filter(|collection| collection.project_id == project_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_spatial_data(
    &self,
    collection_id: &str,
  ) -> Result<Vec<SpatialData>, RepositoryError> {
    let mut state = self.state.lock().unwrap();
    *state.load_calls.entry(collection_id.to_string()).or_insert(0) += 1;
    if state.fail_loads {
      return Err(RepositoryError::Network("connection reset".to_string()));
    }
    Ok(
      state
        .spatial
        .iter()
        .filter(|data| data.collection_id == collection_id)
        .cloned()
        .collect(),
    )
  }

  async fn create_spatial_data(
    &self,
    data: SpatialData,
  ) -> Result<SpatialData, RepositoryError> {
    self.state.lock().unwrap().spatial.push(data.clone());
    Ok(data)
  }

  async fn update_spatial_data(
    &self,
    id: &str,
    patch: SpatialDataPatch,
  ) -> Result<SpatialData, RepositoryError> {
    let mut state = self.state.lock().unwrap();
    if state.fail_updates {
      return Err(RepositoryError::Storage("write rejected".to_string()));
    }
    state.updates.push((id.to_string(), patch.clone()));
    let data = state
      .spatial
      .iter_mut()
      .find(|data| data.id == id)
      .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
    patch.apply_to(data);
    Ok(data.clone())
  }

  async fn delete_spatial_data(&self, id: &str) -> Result<bool, RepositoryError> {
    let mut state = self.state.lock().unwrap();
    let before = state.spatial.len();
    state.spatial.retain(|data| data.id != id);
    Ok(state.spatial.len() < before)
  }
}

#[derive(Default)]
struct SurfaceState {
  next_marker: u64,
  markers: HashMap<MarkerId, MarkerSpec>,
  sources: HashMap<String, Value>,
  fill_layers: HashMap<String, FillLayerSpec>,
  line_layers: HashMap<String, LineLayerSpec>,
  cursor: CursorStyle,
  popups: Vec<(WGS84Coordinate, PopupContent)>,
}

/// Surface double that records every primitive the engine creates.
#[derive(Clone, Default)]
pub struct MockSurface {
  state: Arc<Mutex<SurfaceState>>,
}

impl MockSurface {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn marker_count(&self) -> usize {
    self.state.lock().unwrap().markers.len()
  }

  /// All live markers, ordered by id for deterministic assertions.
  #[must_use]
  pub fn markers(&self) -> Vec<(MarkerId, MarkerSpec)> {
    let state = self.state.lock().unwrap();
    let mut markers: Vec<_> = state
      .markers
      .iter()
      .map(|(id, spec)| (*id, spec.clone()))
      .collect();
    markers.sort_by_key(|(id, _)| id.0);
    markers
  }

  #[must_use]
  pub fn marker(&self, id: MarkerId) -> Option<MarkerSpec> {
    self.state.lock().unwrap().markers.get(&id).cloned()
  }

  #[must_use]
  pub fn source_ids(&self) -> Vec<String> {
    let mut ids: Vec<_> = self.state.lock().unwrap().sources.keys().cloned().collect();
    ids.sort();
    ids
  }

  #[must_use]
  pub fn source(&self, id: &str) -> Option<Value> {
    self.state.lock().unwrap().sources.get(id).cloned()
  }

  #[must_use]
  pub fn fill_layer_ids(&self) -> Vec<String> {
    let mut ids: Vec<_> = self
      .state
      .lock()
      .unwrap()
      .fill_layers
      .keys()
      .cloned()
      .collect();
    ids.sort();
    ids
  }

  #[must_use]
  pub fn line_layer_ids(&self) -> Vec<String> {
    let mut ids: Vec<_> = self
      .state
      .lock()
      .unwrap()
      .line_layers
      .keys()
      .cloned()
      .collect();
    ids.sort();
    ids
  }

  #[must_use]
  pub fn line_layer(&self, id: &str) -> Option<LineLayerSpec> {
    self.state.lock().unwrap().line_layers.get(id).cloned()
  }

  #[must_use]
  pub fn fill_layer(&self, id: &str) -> Option<FillLayerSpec> {
    self.state.lock().unwrap().fill_layers.get(id).cloned()
  }

  #[must_use]
  pub fn cursor(&self) -> CursorStyle {
    self.state.lock().unwrap().cursor
  }

  #[must_use]
  pub fn popups(&self) -> Vec<(WGS84Coordinate, PopupContent)> {
    self.state.lock().unwrap().popups.clone()
  }
}

impl MapSurface for MockSurface {
  fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId {
    let mut state = self.state.lock().unwrap();
    let id = MarkerId(state.next_marker);
    state.next_marker += 1;
    state.markers.insert(id, spec);
    id
  }

  fn remove_marker(&mut self, id: MarkerId) {
    self.state.lock().unwrap().markers.remove(&id);
  }

  fn add_source(&mut self, id: &str, data: Value) {
    self.state.lock().unwrap().sources.insert(id.to_string(), data);
  }

  fn remove_source(&mut self, id: &str) {
    self.state.lock().unwrap().sources.remove(id);
  }

  fn add_fill_layer(&mut self, spec: FillLayerSpec) {
    self
      .state
      .lock()
      .unwrap()
      .fill_layers
      .insert(spec.id.clone(), spec);
  }

  fn add_line_layer(&mut self, spec: LineLayerSpec) {
    self
      .state
      .lock()
      .unwrap()
      .line_layers
      .insert(spec.id.clone(), spec);
  }

  fn remove_layer(&mut self, id: &str) {
    let mut state = self.state.lock().unwrap();
    state.fill_layers.remove(id);
    state.line_layers.remove(id);
  }

  fn set_cursor(&mut self, cursor: CursorStyle) {
    self.state.lock().unwrap().cursor = cursor;
  }

  fn show_popup(&mut self, at: WGS84Coordinate, content: &PopupContent) {
    self.state.lock().unwrap().popups.push((at, content.clone()));
  }
}
