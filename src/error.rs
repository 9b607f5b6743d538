//! Error types.

use thiserror::Error;

/// Problems found by [`WorldConfig::validate`](crate::physics::WorldConfig::validate).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("world bounds on the {axis} axis are empty or inverted (min {min}, max {max})")]
    InvalidBounds { axis: char, min: f32, max: f32 },

    #[error("grid cell size must be positive and finite, got {width} x {height}")]
    InvalidCellSize { width: f32, height: f32 },

    #[error("grid would need {cells} cells on the {axis} axis, at most {max} are allowed")]
    TooManyCells { axis: char, cells: f32, max: usize },
    #[error("meters per unit must be positive and finite, got {0}")]
    InvalidScale(f32),

    #[error("resolver accuracy must be in (0, 1], got {0}")]
    InvalidAccuracy(f32),
}
