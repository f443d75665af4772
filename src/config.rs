//! Settings for building indexes and responding to collisions.
//!
//! Everything here has a sensible `Default`. With the `serde-types` feature
//! the structs can be deserialized from e.g. RON, and any missing field
//! falls back to its default.

use crate::physics::collision::{kdtree::KdTreeParams, quadtree::QuadTreeParams};

/// Errors from validating user-provided settings.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{tree}: max_leaf_items must be at least 1")]
    LeafSize { tree: &'static str },
    #[error("{tree}: max_depth must be at least 1")]
    MaxDepth { tree: &'static str },
    #[error("{tree}: split extent limit must be finite and non-negative, got {value}")]
    SplitExtent { tree: &'static str, value: f32 },
    #[error("difficulty must be in [0, 1], got {0}")]
    Difficulty(f32),
    #[error("hard scatter must be finite, got {0}")]
    HardScatter(f32),
    #[error("gravity must be finite, got {0:?}")]
    Gravity([f32; 3]),
}

/// Which broad phase structure to build over the static geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexKind {
    #[default]
    KdTree,
    QuadTree,
}

/// Table-wide parameters of the collision response.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct PhysicsSettings {
    /// Scatter angle in radians used by primitives whose own scatter is negative.
    pub hard_scatter: f32,
    /// Multiplier applied to every scatter angle, in `[0, 1]`.
    pub difficulty: f32,
    /// Gravitational acceleration, used for resting contacts.
    pub gravity: [f32; 3],
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            hard_scatter: 0.0,
            difficulty: 0.2,
            gravity: [0.0, 0.0, -1.762985],
        }
    }
}

impl PhysicsSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.difficulty) {
            return Err(ConfigError::Difficulty(self.difficulty));
        }
        if !self.hard_scatter.is_finite() {
            return Err(ConfigError::HardScatter(self.hard_scatter));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigError::Gravity(self.gravity));
        }
        Ok(())
    }
}

/// Everything needed to set up collision detection for a table.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct CollisionConfig {
    pub index: IndexKind,
    pub kd: KdTreeParams,
    pub quad: QuadTreeParams,
    pub response: PhysicsSettings,
}

impl CollisionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kd.validate()?;
        self.quad.validate()?;
        self.response.validate()
    }
}
