pub mod config;
pub mod map;
pub mod repository;

pub use config::EngineConfig;
pub use map::controller::{InteractionMode, MapController};
