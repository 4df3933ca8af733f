use std::collections::HashMap;

use serde_json::{Value, json};

use crate::map::geometry::Shape;
use crate::map::layer_tree::LayerTree;
use crate::map::style::collection_color;
use crate::map::surface::{
  FillLayerSpec, LineLayerSpec, MapSurface, MarkerId, MarkerSpec, PopupContent,
};

/// Which row a rendered marker belongs to, for routing click/drag events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerBinding {
  pub collection_id: String,
  pub spatial_id: String,
}

/// Materializes the visible part of the layer tree as map primitives.
///
/// Every tree change is a full teardown followed by a full rebuild; there is
/// no incremental diffing. The map holds human-curated data, so a complete
/// redraw per change is cheap and guarantees no orphaned primitives survive
/// a visibility toggle.
pub struct RenderReconciler {
  markers: Vec<MarkerId>,
  bindings: HashMap<MarkerId, MarkerBinding>,
  sources: Vec<String>,
  layers: Vec<String>,
  fill_alpha: u8,
  rendering: bool,
  queued: bool,
}

impl RenderReconciler {
  #[must_use]
  pub fn new(fill_alpha: u8) -> Self {
    Self {
      markers: Vec::new(),
      bindings: HashMap::new(),
      sources: Vec::new(),
      layers: Vec::new(),
      fill_alpha,
      rendering: false,
      queued: false,
    }
  }

  #[must_use]
  pub fn source_id(collection_id: &str) -> String {
    format!("collection-{collection_id}")
  }

  #[must_use]
  pub fn fill_layer_id(collection_id: &str) -> String {
    format!("collection-{collection_id}-fill")
  }

  #[must_use]
  pub fn outline_layer_id(collection_id: &str) -> String {
    format!("collection-{collection_id}-outline")
  }

  /// Collection a fill layer id belongs to, if it is one of ours.
  #[must_use]
  pub fn collection_of_fill_layer(layer_id: &str) -> Option<&str> {
    layer_id
      .strip_prefix("collection-")
      .and_then(|rest| rest.strip_suffix("-fill"))
  }

  #[must_use]
  pub fn binding(&self, id: MarkerId) -> Option<&MarkerBinding> {
    self.bindings.get(&id)
  }

  /// Tears down the previous materialization and rebuilds from the tree.
  ///
  /// Guarded against re-entrancy: a render triggered while one is already
  /// running is queued and executed right after, so the final primitives
  /// always match the final tree state.
  pub fn render(&mut self, surface: &mut dyn MapSurface, tree: &LayerTree, read_only: bool) {
    if self.rendering {
      self.queued = true;
      return;
    }
    self.rendering = true;
    loop {
      self.teardown(surface);
      self.rebuild(surface, tree, read_only);
      if !self.queued {
        break;
      }
      self.queued = false;
    }
    self.rendering = false;
  }

  /// Removes every primitive this reconciler has created.
  pub fn teardown(&mut self, surface: &mut dyn MapSurface) {
    for id in self.markers.drain(..) {
      surface.remove_marker(id);
    }
    self.bindings.clear();
    // Layers before sources, the order native maps require.
    for id in self.layers.drain(..) {
      surface.remove_layer(&id);
    }
    for id in self.sources.drain(..) {
      surface.remove_source(&id);
    }
  }

  fn rebuild(&mut self, surface: &mut dyn MapSurface, tree: &LayerTree, read_only: bool) {
    for (project_idx, collection_idx, node) in tree.visible_collections() {
      let color = collection_color(project_idx, collection_idx);
      let collection_id = &node.collection.id;
      let mut polygon_features = Vec::new();

      for data in &node.points {
        match Shape::resolve(data) {
          Some(Shape::Point(position)) => {
            let spec = MarkerSpec::new(position, color.to_rgb())
              .draggable(!read_only)
              .with_popup(PopupContent::from(data));
            let marker = surface.add_marker(spec);
            self.markers.push(marker);
            self.bindings.insert(
              marker,
              MarkerBinding {
                collection_id: collection_id.clone(),
                spatial_id: data.id.clone(),
              },
            );
          }
          Some(shape @ Shape::Polygon(_)) => {
            polygon_features.push(polygon_feature(&data.id, &shape));
          }
          None => {
            log::debug!("row {} has no renderable geometry, skipping", data.id);
          }
        }
      }

      if !polygon_features.is_empty() {
        let source_id = Self::source_id(collection_id);
        surface.add_source(
          &source_id,
          json!({"type": "FeatureCollection", "features": polygon_features}),
        );
        self.sources.push(source_id.clone());

        let fill_id = Self::fill_layer_id(collection_id);
        surface.add_fill_layer(FillLayerSpec {
          id: fill_id.clone(),
          source_id: source_id.clone(),
          color: color.to_rgba(self.fill_alpha),
        });
        self.layers.push(fill_id);

        let outline_id = Self::outline_layer_id(collection_id);
        surface.add_line_layer(LineLayerSpec {
          id: outline_id.clone(),
          source_id,
          color: color.to_rgb(),
          width: 2.0,
          dash: None,
        });
        self.layers.push(outline_id);
      }
    }
  }
}

fn polygon_feature(spatial_id: &str, shape: &Shape) -> Value {
  let wire = shape.to_wire();
  json!({
    "type": "Feature",
    "id": spatial_id,
    "properties": {},
    "geometry": {"type": wire.kind, "coordinates": wire.coordinates},
  })
}
