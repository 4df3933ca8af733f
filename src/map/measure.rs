use serde_json::json;

use crate::map::coordinates::{WGS84Coordinate, format_distance, path_distance_in_meters};
use crate::map::style::Rgba;
use crate::map::surface::{CursorStyle, LineLayerSpec, MapSurface, MarkerId, MarkerKind, MarkerSpec};

pub const MEASURE_SOURCE: &str = "measure-line";
pub const MEASURE_LINE: &str = "measure-line-stroke";

const MEASURE_COLOR: Rgba = Rgba::rgba(230, 57, 70, 255);

/// Ephemeral geodesic distance measurement.
///
/// Every map click appends a point, drops a small marker and redraws a
/// dashed line through all accumulated points; the cumulative distance label
/// sits on the most recently placed marker. Nothing is ever persisted and
/// [`MeasureSession::stop`] removes every primitive again.
pub struct MeasureSession {
  points: Vec<WGS84Coordinate>,
  markers: Vec<MarkerId>,
  line: bool,
}

impl MeasureSession {
  #[must_use]
  pub fn start(surface: &mut dyn MapSurface) -> Self {
    surface.set_cursor(CursorStyle::Crosshair);
    Self {
      points: Vec::new(),
      markers: Vec::new(),
      line: false,
    }
  }

  pub fn add_point(&mut self, surface: &mut dyn MapSurface, at: WGS84Coordinate) {
    // The distance label moves to the newest marker; the previous one is
    // re-added bare.
    if let (Some(prev_id), Some(prev_pos)) = (self.markers.pop(), self.points.last().copied()) {
      surface.remove_marker(prev_id);
      let plain = surface
        .add_marker(MarkerSpec::new(prev_pos, MEASURE_COLOR).with_kind(MarkerKind::MeasurePoint));
      self.markers.push(plain);
    }

    self.points.push(at);
    let label = format_distance(self.total_distance());
    let marker = surface.add_marker(
      MarkerSpec::new(at, MEASURE_COLOR)
        .with_kind(MarkerKind::MeasurePoint)
        .with_label(label),
    );
    self.markers.push(marker);
    self.refresh_line(surface);
  }

  #[must_use]
  pub fn total_distance(&self) -> f32 {
    path_distance_in_meters(&self.points)
  }

  #[must_use]
  pub fn points(&self) -> &[WGS84Coordinate] {
    &self.points
  }

  /// Removes all measurement primitives and restores the cursor.
  pub fn stop(mut self, surface: &mut dyn MapSurface) {
    for marker in self.markers.drain(..) {
      surface.remove_marker(marker);
    }
    if self.line {
      surface.remove_layer(MEASURE_LINE);
      surface.remove_source(MEASURE_SOURCE);
    }
    surface.set_cursor(CursorStyle::Default);
  }

  fn refresh_line(&mut self, surface: &mut dyn MapSurface) {
    if self.line {
      surface.remove_layer(MEASURE_LINE);
      surface.remove_source(MEASURE_SOURCE);
      self.line = false;
    }
    if self.points.len() < 2 {
      return;
    }
    let coordinates: Vec<_> = self
      .points
      .iter()
      .map(|c| json!([f64::from(c.lon), f64::from(c.lat)]))
      .collect();
    surface.add_source(
      MEASURE_SOURCE,
      json!({
        "type": "FeatureCollection",
        "features": [{
          "type": "Feature",
          "properties": {},
          "geometry": {"type": "LineString", "coordinates": coordinates},
        }],
      }),
    );
    surface.add_line_layer(LineLayerSpec {
      id: MEASURE_LINE.to_string(),
      source_id: MEASURE_SOURCE.to_string(),
      color: MEASURE_COLOR,
      width: 2.0,
      dash: Some((2.0, 2.0)),
    });
    self.line = true;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::test_utils::MockSurface;

  #[test]
  fn starting_sets_the_crosshair_cursor() {
    let mut surface = MockSurface::new();
    let session = MeasureSession::start(&mut surface);
    assert_eq!(surface.cursor(), CursorStyle::Crosshair);
    assert!(session.points().is_empty());
  }

  #[test]
  fn label_sits_on_the_most_recent_marker_only() {
    let mut surface = MockSurface::new();
    let mut session = MeasureSession::start(&mut surface);

    session.add_point(&mut surface, WGS84Coordinate::new(40.4168, -3.7038));
    session.add_point(&mut surface, WGS84Coordinate::new(40.4179, -3.7143));
    session.add_point(&mut surface, WGS84Coordinate::new(40.42, -3.72));

    let markers = surface.markers();
    assert_eq!(markers.len(), 3);
    let labelled: Vec<_> = markers
      .iter()
      .filter(|(_, spec)| spec.label.is_some())
      .collect();
    assert_eq!(labelled.len(), 1);
    assert_eq!(
      labelled[0].1.label.as_deref(),
      Some(format_distance(session.total_distance()).as_str())
    );
  }

  #[test]
  fn distance_accumulates_over_consecutive_pairs() {
    let mut surface = MockSurface::new();
    let mut session = MeasureSession::start(&mut surface);

    session.add_point(&mut surface, WGS84Coordinate::new(40.4168, -3.7038));
    assert!(session.total_distance().abs() < f32::EPSILON);

    session.add_point(&mut surface, WGS84Coordinate::new(40.4179, -3.7143));
    let dist = session.total_distance();
    assert!((850.0..900.0).contains(&dist), "got {dist}");
  }

  #[test]
  fn preview_line_is_dashed_and_follows_all_points() {
    let mut surface = MockSurface::new();
    let mut session = MeasureSession::start(&mut surface);

    session.add_point(&mut surface, WGS84Coordinate::new(0.0, 0.0));
    assert!(surface.line_layer(MEASURE_LINE).is_none());

    session.add_point(&mut surface, WGS84Coordinate::new(0.0, 1.0));
    session.add_point(&mut surface, WGS84Coordinate::new(1.0, 1.0));
    let line = surface.line_layer(MEASURE_LINE).unwrap();
    assert!(line.dash.is_some());

    let source = surface.source(MEASURE_SOURCE).unwrap();
    let coordinates = source["features"][0]["geometry"]["coordinates"]
      .as_array()
      .unwrap();
    assert_eq!(coordinates.len(), 3);
  }

  #[test]
  fn stopping_removes_every_primitive() {
    let mut surface = MockSurface::new();
    let mut session = MeasureSession::start(&mut surface);
    session.add_point(&mut surface, WGS84Coordinate::new(0.0, 0.0));
    session.add_point(&mut surface, WGS84Coordinate::new(0.0, 1.0));

    session.stop(&mut surface);
    assert_eq!(surface.marker_count(), 0);
    assert!(surface.source_ids().is_empty());
    assert!(surface.line_layer_ids().is_empty());
    assert_eq!(surface.cursor(), CursorStyle::Default);
  }
}
