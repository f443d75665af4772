//! The spatial index narrows the set of primitives a ball might hit
//! down to those near its path, for more accurate narrow phase inspection.

use super::{kdtree::KdTree, quadtree::QuadTree, Primitive};
use crate::{
    config::{CollisionConfig, ConfigError, IndexKind},
    math::Vec3,
};

/// A broad phase structure over a fixed slice of primitives.
pub trait SpatialIndex {
    /// Call `visit` once with the slot of every primitive whose bounding box
    /// touches the sphere at `center` with squared radius `radius_sq`.
    fn query<F: FnMut(usize)>(&self, center: Vec3, radius_sq: f32, visit: F);
}

impl SpatialIndex for KdTree {
    fn query<F: FnMut(usize)>(&self, center: Vec3, radius_sq: f32, visit: F) {
        KdTree::query(self, center, radius_sq, visit);
    }
}

impl SpatialIndex for QuadTree {
    fn query<F: FnMut(usize)>(&self, center: Vec3, radius_sq: f32, visit: F) {
        QuadTree::query(self, center, radius_sq, visit);
    }
}

/// Either kind of tree, chosen at runtime.
#[derive(Clone, Debug)]
pub enum Index {
    Kd(KdTree),
    Quad(QuadTree),
}

impl Index {
    /// Build the given kind of tree with default parameters.
    pub fn build(kind: IndexKind, prims: &[Primitive]) -> Self {
        match kind {
            IndexKind::KdTree => Self::Kd(KdTree::build(prims)),
            IndexKind::QuadTree => Self::Quad(QuadTree::build(prims)),
        }
    }

    pub fn from_config(config: &CollisionConfig, prims: &[Primitive]) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(match config.index {
            IndexKind::KdTree => Self::Kd(KdTree::build_with(prims, &config.kd)?),
            IndexKind::QuadTree => Self::Quad(QuadTree::build_with(prims, &config.quad)?),
        })
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Kd(_) => IndexKind::KdTree,
            Self::Quad(_) => IndexKind::QuadTree,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Kd(tree) => tree.len(),
            Self::Quad(tree) => tree.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpatialIndex for Index {
    fn query<F: FnMut(usize)>(&self, center: Vec3, radius_sq: f32, visit: F) {
        match self {
            Self::Kd(tree) => tree.query(center, radius_sq, visit),
            Self::Quad(tree) => tree.query(center, radius_sq, visit),
        }
    }
}
