use crate::map::style::{Color, collection_color};
use crate::repository::{Collection, Project, SpatialData};

/// View state of a project and its collections. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
  pub project: Project,
  pub collections: Vec<CollectionNode>,
  pub expanded: bool,
  pub visible: bool,
}

/// View state of a collection. `points` stays empty until the first
/// visibility or expansion toggle triggers a load; `loaded` distinguishes
/// "never fetched" from "fetched and empty".
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionNode {
  pub collection: Collection,
  pub points: Vec<SpatialData>,
  pub loaded: bool,
  pub expanded: bool,
  pub visible: bool,
}

/// The Project → Collection → SpatialData tree as pure data. All
/// transitions consume the tree and return the next one, so the cascade
/// rules are testable without any I/O.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerTree {
  pub projects: Vec<ProjectNode>,
}

impl LayerTree {
  /// Builds the initial tree. Projects start visible according to their
  /// "show on general map" flag; collections start hidden and unloaded.
  #[must_use]
  pub fn from_parts(parts: Vec<(Project, Vec<Collection>)>) -> Self {
    let projects = parts
      .into_iter()
      .map(|(project, collections)| ProjectNode {
        visible: project.show_on_general_map,
        expanded: false,
        collections: collections
          .into_iter()
          .map(|collection| CollectionNode {
            collection,
            points: Vec::new(),
            loaded: false,
            expanded: false,
            visible: false,
          })
          .collect(),
        project,
      })
      .collect();
    Self { projects }
  }

  /// Flips a project's visible flag. Hiding a project forces every child
  /// collection invisible; showing it again restores nothing — children
  /// keep whatever flag they had at that point.
  #[must_use]
  pub fn toggle_project_visible(mut self, project_id: &str) -> Self {
    if let Some(node) = self.project_mut(project_id) {
      node.visible = !node.visible;
      if !node.visible {
        for collection in &mut node.collections {
          collection.visible = false;
        }
      }
    }
    self
  }

  #[must_use]
  pub fn toggle_collection_visible(mut self, project_id: &str, collection_id: &str) -> Self {
    if let Some(node) = self.collection_mut(project_id, collection_id) {
      node.visible = !node.visible;
    }
    self
  }

  #[must_use]
  pub fn toggle_project_expanded(mut self, project_id: &str) -> Self {
    if let Some(node) = self.project_mut(project_id) {
      node.expanded = !node.expanded;
    }
    self
  }

  #[must_use]
  pub fn toggle_collection_expanded(mut self, project_id: &str, collection_id: &str) -> Self {
    if let Some(node) = self.collection_mut(project_id, collection_id) {
      node.expanded = !node.expanded;
    }
    self
  }

  /// Installs a fetched points array and marks the collection loaded.
  #[must_use]
  pub fn with_points(mut self, collection_id: &str, points: Vec<SpatialData>) -> Self {
    if let Some(node) = self.collection_by_id_mut(collection_id) {
      node.points = points;
      node.loaded = true;
    }
    self
  }

  /// Effective visibility is project-visible AND collection-visible.
  pub fn visible_collections(&self) -> impl Iterator<Item = (usize, usize, &CollectionNode)> {
    self
      .projects
      .iter()
      .enumerate()
      .filter(|(_, project)| project.visible)
      .flat_map(|(project_idx, project)| {
        project
          .collections
          .iter()
          .enumerate()
          .filter(|(_, collection)| collection.visible)
          .map(move |(collection_idx, collection)| (project_idx, collection_idx, collection))
      })
  }

  /// Visible collections paired with their allocated display color, for a
  /// legend that matches the rendered layers.
  #[must_use]
  pub fn legend(&self) -> Vec<(String, Color)> {
    self
      .visible_collections()
      .map(|(project_idx, collection_idx, node)| {
        (
          node.collection.id.clone(),
          collection_color(project_idx, collection_idx),
        )
      })
      .collect()
  }

  #[must_use]
  pub fn collection(&self, collection_id: &str) -> Option<&CollectionNode> {
    self
      .projects
      .iter()
      .flat_map(|project| project.collections.iter())
      .find(|node| node.collection.id == collection_id)
  }

  /// Position of a collection as `(project_idx, collection_idx)`.
  #[must_use]
  pub fn collection_position(&self, collection_id: &str) -> Option<(usize, usize)> {
    self.projects.iter().enumerate().find_map(|(pi, project)| {
      project
        .collections
        .iter()
        .position(|node| node.collection.id == collection_id)
        .map(|ci| (pi, ci))
    })
  }

  /// Looks a loaded row up by id across all collections.
  #[must_use]
  pub fn find_spatial_data(&self, spatial_id: &str) -> Option<&SpatialData> {
    self
      .projects
      .iter()
      .flat_map(|project| project.collections.iter())
      .flat_map(|node| node.points.iter())
      .find(|data| data.id == spatial_id)
  }

  fn project_mut(&mut self, project_id: &str) -> Option<&mut ProjectNode> {
    self
      .projects
      .iter_mut()
      .find(|node| node.project.id == project_id)
  }

  fn collection_mut(
    &mut self,
    project_id: &str,
    collection_id: &str,
  ) -> Option<&mut CollectionNode> {
    self
      .project_mut(project_id)?
      .collections
      .iter_mut()
      .find(|node| node.collection.id == collection_id)
  }

  fn collection_by_id_mut(&mut self, collection_id: &str) -> Option<&mut CollectionNode> {
    self
      .projects
      .iter_mut()
      .flat_map(|project| project.collections.iter_mut())
      .find(|node| node.collection.id == collection_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::test_utils::{collection, project};

  fn two_collection_tree() -> LayerTree {
    LayerTree::from_parts(vec![(
      project("p1"),
      vec![collection("c1", "p1"), collection("c2", "p1")],
    )])
  }

  #[test]
  fn hiding_a_project_cascades_to_collections() {
    let tree = two_collection_tree()
      .toggle_collection_visible("p1", "c1")
      .toggle_collection_visible("p1", "c2");
    assert_eq!(tree.visible_collections().count(), 2);

    let tree = tree.toggle_project_visible("p1");
    assert!(!tree.projects[0].visible);
    assert!(tree.projects[0].collections.iter().all(|c| !c.visible));
    assert_eq!(tree.visible_collections().count(), 0);
  }

  #[test]
  fn showing_a_project_again_restores_nothing() {
    let tree = two_collection_tree()
      .toggle_collection_visible("p1", "c1")
      .toggle_project_visible("p1")
      .toggle_project_visible("p1");
    assert!(tree.projects[0].visible);
    // c1 was forced off by the hide and stays off.
    assert!(tree.projects[0].collections.iter().all(|c| !c.visible));
  }

  #[test]
  fn collection_visibility_requires_visible_project() {
    let tree = two_collection_tree()
      .toggle_project_visible("p1")
      .toggle_collection_visible("p1", "c1");
    assert!(tree.projects[0].collections[0].visible);
    assert_eq!(tree.visible_collections().count(), 0);
  }

  #[test]
  fn expansion_is_independent_of_visibility() {
    let tree = two_collection_tree()
      .toggle_project_expanded("p1")
      .toggle_collection_expanded("p1", "c1");
    assert!(tree.projects[0].expanded);
    assert!(tree.projects[0].collections[0].expanded);
    assert!(!tree.projects[0].collections[0].visible);
  }

  #[test]
  fn with_points_marks_loaded() {
    let tree = two_collection_tree();
    assert!(!tree.collection("c1").unwrap().loaded);

    let tree = tree.with_points("c1", Vec::new());
    let node = tree.collection("c1").unwrap();
    assert!(node.loaded);
    assert!(node.points.is_empty());
  }

  #[test]
  fn hidden_projects_start_invisible() {
    let mut hidden = project("p2");
    hidden.show_on_general_map = false;
    let tree = LayerTree::from_parts(vec![(hidden, vec![collection("c1", "p2")])]);
    assert!(!tree.projects[0].visible);
  }

  #[test]
  fn legend_matches_visible_collections() {
    let tree = two_collection_tree()
      .toggle_collection_visible("p1", "c1")
      .toggle_collection_visible("p1", "c2");
    let legend = tree.legend();
    assert_eq!(legend.len(), 2);
    assert_eq!(legend[0], ("c1".to_string(), collection_color(0, 0)));
    assert_eq!(legend[1], ("c2".to_string(), collection_color(0, 1)));
  }

  #[test]
  fn lookup_helpers() {
    let tree = two_collection_tree().with_points(
      "c2",
      vec![SpatialData::new("sd9", "c2", "container")],
    );
    assert_eq!(tree.collection_position("c2"), Some((0, 1)));
    assert_eq!(tree.find_spatial_data("sd9").unwrap().name, "container");
    assert_eq!(tree.find_spatial_data("nope"), None);
  }
}
