use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The standard WGS84 coordinate system.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f32,
  #[serde(alias = "longitude")]
  pub lon: f32,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f32, lon: f32) -> Self {
    Self { lat, lon }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    -90.0 < self.lat && self.lat < 90.0 && -180.0 < self.lon && self.lon < 180.0
  }
}

impl Eq for WGS84Coordinate {}

impl WGS84Coordinate {
  /// Exact equality comparison using bit representation
  #[must_use]
  pub fn exact_eq(&self, other: &Self) -> bool {
    self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
  }
}

/// Great-circle distance between two coordinates via the haversine formula.
#[must_use]
pub fn distance_in_meters(coord1: WGS84Coordinate, coord2: WGS84Coordinate) -> f32 {
  let d_lat = (coord2.lat - coord1.lat).to_radians();
  let d_lon = (coord2.lon - coord1.lon).to_radians();
  let a = f32::sin(d_lat / 2.0) * f32::sin(d_lat / 2.0)
    + f32::cos(coord1.lat.to_radians())
      * f32::cos(coord2.lat.to_radians())
      * f32::sin(d_lon / 2.0)
      * f32::sin(d_lon / 2.0);
  let c = 2.0 * f32::atan2(a.sqrt(), (1.0 - a).sqrt());
  6_371_000.0 * c
}

/// Cumulative distance along a sequence of coordinates.
#[must_use]
pub fn path_distance_in_meters(coords: &[WGS84Coordinate]) -> f32 {
  coords
    .iter()
    .tuple_windows()
    .map(|(a, b)| distance_in_meters(*a, *b))
    .sum()
}

/// Formats a distance as meters below 1000 m and as kilometers above.
#[must_use]
pub fn format_distance(meters: f32) -> String {
  if meters < 1000.0 {
    format!("{meters:.2} m")
  } else {
    format!("{:.2} km", meters / 1000.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  #[test]
  fn distance() {
    let coord1 = WGS84Coordinate { lat: 0.0, lon: 0.0 };
    let coord2 = WGS84Coordinate { lat: 0.0, lon: 1.0 };
    assert_approx_eq!(distance_in_meters(coord1, coord2), 111_195.08, 0.2);

    let puerta_del_sol = WGS84Coordinate {
      lat: 40.4168,
      lon: -3.7038,
    };
    let casa_de_campo = WGS84Coordinate {
      lat: 40.4179,
      lon: -3.7143,
    };
    let dist = distance_in_meters(puerta_del_sol, casa_de_campo);
    assert!((850.0..900.0).contains(&dist), "got {dist}");
  }

  #[test]
  fn path_distance_sums_consecutive_pairs() {
    let a = WGS84Coordinate::new(0.0, 0.0);
    let b = WGS84Coordinate::new(0.0, 1.0);
    let c = WGS84Coordinate::new(0.0, 2.0);
    let total = path_distance_in_meters(&[a, b, c]);
    assert_approx_eq!(
      total,
      distance_in_meters(a, b) + distance_in_meters(b, c),
      0.1
    );
    assert_approx_eq!(path_distance_in_meters(&[a]), 0.0, f32::EPSILON);
    assert_approx_eq!(path_distance_in_meters(&[]), 0.0, f32::EPSILON);
  }

  #[test]
  fn distance_formatting_switches_at_one_kilometer() {
    assert_eq!(format_distance(0.0), "0.00 m");
    assert_eq!(format_distance(432.129), "432.13 m");
    assert_eq!(format_distance(999.99), "999.99 m");
    assert_eq!(format_distance(1000.0), "1.00 km");
    assert_eq!(format_distance(12_345.6), "12.35 km");
  }

  #[test]
  fn validity() {
    assert!(WGS84Coordinate::new(40.0, -3.0).is_valid());
    assert!(!WGS84Coordinate::new(90.0, 0.0).is_valid());
    assert!(!WGS84Coordinate::new(0.0, -180.0).is_valid());
  }
}
