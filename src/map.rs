/// Owns the tree, the sessions and all event routing.
pub mod controller;
/// Contains everything needed to handle coordinates.
pub mod coordinates;
/// Interactive point and polygon editing.
pub mod edit;
/// Geometry resolution at the repository boundary.
pub mod geometry;
/// The Project → Collection → SpatialData view tree.
pub mod layer_tree;
/// Geodesic distance measurement.
pub mod measure;
/// Turns the visible tree into map primitives.
pub mod reconciler;
/// Per-collection color assignment.
pub mod style;
/// The map surface contract and its events.
pub mod surface;
/// Doubles and builders for tests.
pub mod test_utils;
