use std::path::PathBuf;

use dirs::home_dir;
use log::error;

/// Translucency of rendered polygon fills, unless configured otherwise.
const DEFAULT_FILL_ALPHA: u8 = 80;

/// Engine configuration, merged from environment variables, an optional
/// JSON config file and built-in defaults, in that order of precedence.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
  pub config_path: Option<PathBuf>,
  /// Read-only surfaces show popups instead of opening edit sessions and
  /// render markers non-draggable.
  pub read_only: Option<bool>,
  pub fill_alpha: Option<u8>,
}

impl EngineConfig {
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged
  }

  #[must_use]
  pub fn read_only(&self) -> bool {
    self.read_only.unwrap_or(false)
  }

  #[must_use]
  pub fn fill_alpha(&self) -> u8 {
    self.fill_alpha.unwrap_or(DEFAULT_FILL_ALPHA)
  }

  fn from_env() -> Self {
    let config_path = std::env::var("ECOMAP_CONFIG").ok().map(PathBuf::from);
    let read_only = std::env::var("ECOMAP_READ_ONLY")
      .ok()
      .map(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let fill_alpha = std::env::var("ECOMAP_FILL_ALPHA")
      .ok()
      .and_then(|v| v.parse().ok());

    Self {
      config_path,
      read_only,
      fill_alpha,
    }
  }

  fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    self.read_only = self.read_only.or(other.read_only);
    self.fill_alpha = self.fill_alpha.or(other.fill_alpha);
    self
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("ECOMAP_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("ecomap")))?;
    let config_path = config_path.join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()?
  }
}
