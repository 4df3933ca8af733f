use serde::{Deserialize, Serialize};

/// Plain RGBA color handed to the map surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Rgba {
  #[must_use]
  pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }
}

static PALETTE: [Color; 8] = [
  Color::Blue,
  Color::Red,
  Color::Green,
  Color::Orange,
  Color::Purple,
  Color::Teal,
  Color::Pink,
  Color::Brown,
];

/// The fixed palette collections are colored from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Color {
  #[default]
  Blue,
  Red,
  Green,
  Orange,
  Purple,
  Teal,
  Pink,
  Brown,
}

impl Color {
  #[must_use]
  pub fn to_rgba(self, alpha: u8) -> Rgba {
    match self {
      Color::Blue => Rgba::rgba(31, 119, 180, alpha),
      Color::Red => Rgba::rgba(214, 39, 40, alpha),
      Color::Green => Rgba::rgba(44, 160, 44, alpha),
      Color::Orange => Rgba::rgba(255, 127, 14, alpha),
      Color::Purple => Rgba::rgba(148, 103, 189, alpha),
      Color::Teal => Rgba::rgba(23, 190, 207, alpha),
      Color::Pink => Rgba::rgba(227, 119, 194, alpha),
      Color::Brown => Rgba::rgba(140, 86, 75, alpha),
    }
  }

  #[must_use]
  pub fn to_rgb(self) -> Rgba {
    self.to_rgba(255)
  }

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      Color::Blue => "blue",
      Color::Red => "red",
      Color::Green => "green",
      Color::Orange => "orange",
      Color::Purple => "purple",
      Color::Teal => "teal",
      Color::Pink => "pink",
      Color::Brown => "brown",
    }
  }

  #[must_use]
  pub fn all() -> &'static [Color] {
    &PALETTE
  }
}

/// Deterministic color for the collection at `(project_idx, collection_idx)`.
///
/// Stable across re-renders within a session as long as the project and
/// collection ordering is stable; reordering or inserting entries reassigns
/// colors. Renderer, edit preview and legend all go through this function.
#[must_use]
pub fn collection_color(project_idx: usize, collection_idx: usize) -> Color {
  PALETTE[(project_idx * 10 + collection_idx) % PALETTE.len()]
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[rstest]
  #[case(0, 0, Color::Blue)]
  #[case(0, 1, Color::Red)]
  #[case(0, 7, Color::Brown)]
  #[case(0, 8, Color::Blue)]
  #[case(1, 0, Color::Green)]
  #[case(1, 3, Color::Teal)]
  #[case(2, 0, Color::Purple)]
  fn palette_assignment(
    #[case] project_idx: usize,
    #[case] collection_idx: usize,
    #[case] expected: Color,
  ) {
    assert_eq!(collection_color(project_idx, collection_idx), expected);
  }

  #[test]
  fn assignment_is_deterministic() {
    for project_idx in 0..5 {
      for collection_idx in 0..20 {
        assert_eq!(
          collection_color(project_idx, collection_idx),
          collection_color(project_idx, collection_idx)
        );
      }
    }
  }

  #[test]
  fn fill_and_stroke_share_the_hue() {
    let fill = Color::Teal.to_rgba(80);
    let stroke = Color::Teal.to_rgb();
    assert_eq!((fill.r, fill.g, fill.b), (stroke.r, stroke.g, stroke.b));
    assert_eq!(fill.a, 80);
    assert_eq!(stroke.a, 255);
  }
}
