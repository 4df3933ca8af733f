use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map::geometry::WireGeometry;

#[derive(Error, Debug)]
pub enum RepositoryError {
  #[error("network failure: {0}")]
  Network(String),
  #[error("storage failure: {0}")]
  Storage(String),
  #[error("not found: {0}")]
  NotFound(String),
}

/// A project groups collections and gates whether they appear on the
/// general map at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default = "default_true")]
  pub show_on_general_map: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

/// A collection of spatial data owned by exactly one project. Its display
/// color is derived from its position in the tree, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
  pub id: String,
  pub project_id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

/// A single point or polygon row as stored by the backend.
///
/// `geometry` carries the authoritative GeoJSON shape; `geometry_type` is an
/// advisory tag that may disagree on legacy rows. The flat
/// `latitude`/`longitude` fields mirror `geometry.coordinates` for points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialData {
  pub id: String,
  pub collection_id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub geometry_type: Option<String>,
  #[serde(default)]
  pub geometry: Option<WireGeometry>,
  #[serde(default)]
  pub latitude: Option<f32>,
  #[serde(default)]
  pub longitude: Option<f32>,
  #[serde(default)]
  pub address: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

impl SpatialData {
  #[must_use]
  pub fn new(id: &str, collection_id: &str, name: &str) -> Self {
    Self {
      id: id.to_string(),
      collection_id: collection_id.to_string(),
      name: name.to_string(),
      description: None,
      category: None,
      geometry_type: None,
      geometry: None,
      latitude: None,
      longitude: None,
      address: None,
      image_url: None,
      created_at: None,
      updated_at: None,
    }
  }
}

/// Partial update for a spatial data row. Absent fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialDataPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub latitude: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub longitude: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub geometry: Option<WireGeometry>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub geometry_type: Option<String>,
}

impl SpatialDataPatch {
  /// Applies the patch to an entity, the way the backend would.
  pub fn apply_to(&self, data: &mut SpatialData) {
    if let Some(name) = &self.name {
      data.name.clone_from(name);
    }
    if let Some(description) = &self.description {
      data.description = Some(description.clone());
    }
    if let Some(category) = &self.category {
      data.category = Some(category.clone());
    }
    if let Some(address) = &self.address {
      data.address = Some(address.clone());
    }
    if let Some(latitude) = self.latitude {
      data.latitude = Some(latitude);
    }
    if let Some(longitude) = self.longitude {
      data.longitude = Some(longitude);
    }
    if let Some(geometry) = &self.geometry {
      data.geometry = Some(geometry.clone());
    }
    if let Some(geometry_type) = &self.geometry_type {
      data.geometry_type = Some(geometry_type.clone());
    }
  }
}

/// The persistence collaborator. All failures are explicit `Err` values.
#[async_trait]
pub trait SpatialRepository: Send + Sync {
  async fn list_projects(&self) -> Result<Vec<Project>, RepositoryError>;

  async fn list_collections(&self, project_id: &str) -> Result<Vec<Collection>, RepositoryError>;

  async fn list_spatial_data(
    &self,
    collection_id: &str,
  ) -> Result<Vec<SpatialData>, RepositoryError>;

  async fn create_spatial_data(&self, data: SpatialData)
  -> Result<SpatialData, RepositoryError>;

  async fn update_spatial_data(
    &self,
    id: &str,
    patch: SpatialDataPatch,
  ) -> Result<SpatialData, RepositoryError>;

  async fn delete_spatial_data(&self, id: &str) -> Result<bool, RepositoryError>;
}

fn default_true() -> bool {
  true
}
