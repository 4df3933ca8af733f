//! End-to-end engine flow against mock repository and surface doubles.

use std::sync::Arc;

use ecomap::map::coordinates::WGS84Coordinate;
use ecomap::map::geometry::ShapeKind;
use ecomap::map::reconciler::RenderReconciler;
use ecomap::map::surface::SurfaceEvent;
use ecomap::map::test_utils::{MockRepository, MockSurface, collection, point, polygon, project};
use ecomap::{EngineConfig, MapController};

fn seeded() -> (MockRepository, MockSurface, MapController) {
  let _ = env_logger::builder().is_test(true).try_init();
  let repository = MockRepository::new()
    .with_project(project("p1"))
    .with_collection(collection("containers", "p1"))
    .with_collection(collection("zones", "p1"))
    .with_spatial_data(point("sd1", "containers", 40.4168, -3.7038))
    .with_spatial_data(point("sd2", "containers", 40.42, -3.71))
    .with_spatial_data(polygon(
      "zone1",
      "zones",
      &[(40.0, -3.0), (40.0, -2.9), (40.1, -2.9), (40.1, -3.0), (40.0, -3.0)],
    ));
  let surface = MockSurface::new();
  let controller = MapController::new(
    Arc::new(repository.clone()),
    Box::new(surface.clone()),
    EngineConfig::default(),
  );
  (repository, surface, controller)
}

#[tokio::test]
async fn visibility_toggles_drive_the_rendered_primitives() {
  let (repository, surface, mut controller) = seeded();
  controller.load_projects().await.unwrap();
  assert_eq!(surface.marker_count(), 0);

  controller
    .toggle_collection_visible("p1", "containers")
    .await;
  assert_eq!(surface.marker_count(), 2);
  assert!(surface.source_ids().is_empty());

  controller.toggle_collection_visible("p1", "zones").await;
  assert_eq!(surface.marker_count(), 2);
  assert_eq!(surface.source_ids(), vec!["collection-zones"]);
  assert_eq!(surface.fill_layer_ids(), vec!["collection-zones-fill"]);
  assert_eq!(surface.line_layer_ids(), vec!["collection-zones-outline"]);

  // Hiding the project tears everything down and forgets child visibility.
  controller.toggle_project_visible("p1");
  assert_eq!(surface.marker_count(), 0);
  assert!(surface.source_ids().is_empty());

  controller.toggle_project_visible("p1");
  assert_eq!(surface.marker_count(), 0);

  // Each collection was loaded exactly once through all of this.
  assert_eq!(repository.load_calls("containers"), 1);
  assert_eq!(repository.load_calls("zones"), 1);
}

#[tokio::test]
async fn polygon_edit_drag_and_save_round_trip() {
  let (repository, surface, mut controller) = seeded();
  controller.load_projects().await.unwrap();
  controller.toggle_collection_visible("p1", "zones").await;

  controller
    .handle_event(SurfaceEvent::LayerClicked {
      layer_id: RenderReconciler::fill_layer_id("zones"),
      feature_id: "zone1".to_string(),
      at: WGS84Coordinate::new(40.05, -2.95),
    })
    .await
    .unwrap();

  let handles = {
    let session = controller.edit_session().unwrap();
    assert_eq!(session.kind(), ShapeKind::Polygon);
    session.handles().to_vec()
  };
  assert_eq!(handles.len(), 4);

  // Drag the first vertex; the closing coordinate must follow.
  controller
    .handle_event(SurfaceEvent::MarkerDragged {
      id: handles[0],
      to: WGS84Coordinate::new(39.95, -3.05),
    })
    .await
    .unwrap();
  controller.save_edit().await.unwrap();
  assert!(!controller.is_editing());

  let saved = repository.spatial_data("zone1").unwrap();
  assert_eq!(saved.geometry_type.as_deref(), Some("polygon"));
  let ring = saved.geometry.unwrap().coordinates[0].as_array().unwrap().clone();
  assert_eq!(ring.len(), 5);
  assert_eq!(ring.first(), ring.last());
  let first = ring[0].as_array().unwrap();
  assert!((first[0].as_f64().unwrap() - -3.05).abs() < 1e-4);
  assert!((first[1].as_f64().unwrap() - 39.95).abs() < 1e-4);

  // Edit artifacts are gone, the rendered layer set is back to normal.
  assert_eq!(surface.source_ids(), vec!["collection-zones"]);
  assert_eq!(surface.marker_count(), 0);
}

#[tokio::test]
async fn measurement_session_is_ephemeral() {
  let (_repository, surface, mut controller) = seeded();
  controller.load_projects().await.unwrap();
  controller
    .toggle_collection_visible("p1", "containers")
    .await;
  let rendered = surface.marker_count();

  controller.toggle_measurement();
  controller
    .handle_event(SurfaceEvent::MapClick(WGS84Coordinate::new(
      40.4168, -3.7038,
    )))
    .await
    .unwrap();
  controller
    .handle_event(SurfaceEvent::MapClick(WGS84Coordinate::new(
      40.4179, -3.7143,
    )))
    .await
    .unwrap();

  assert_eq!(surface.marker_count(), rendered + 2);
  let labels: Vec<_> = surface
    .markers()
    .into_iter()
    .filter_map(|(_, spec)| spec.label)
    .collect();
  assert_eq!(labels.len(), 1);
  assert!(labels[0].ends_with(" m"), "label was {}", labels[0]);

  controller.toggle_measurement();
  assert_eq!(surface.marker_count(), rendered);
  assert!(surface.line_layer_ids().is_empty());
  assert_eq!(surface.source_ids(), Vec::<String>::new());
}

#[tokio::test]
async fn point_save_writes_consistent_wire_fields() {
  let (repository, _surface, mut controller) = seeded();
  controller.load_projects().await.unwrap();
  controller
    .toggle_collection_visible("p1", "containers")
    .await;

  assert!(controller.open_edit_session("sd1"));
  {
    let session = controller.edit_session_mut().unwrap();
    session.set_position(WGS84Coordinate::new(40.0, -3.0));
    session.set_address("Calle Mayor 1");
  }
  controller.save_edit().await.unwrap();

  let saved = repository.spatial_data("sd1").unwrap();
  assert_eq!(saved.latitude, Some(40.0));
  assert_eq!(saved.longitude, Some(-3.0));
  assert_eq!(saved.address.as_deref(), Some("Calle Mayor 1"));
  assert_eq!(saved.geometry_type.as_deref(), Some("point"));
  let wire = saved.geometry.unwrap();
  assert_eq!(wire.kind, "Point");
  assert_eq!(wire.coordinates, serde_json::json!([-3.0, 40.0]));
}
