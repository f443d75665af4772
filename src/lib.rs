//! Collision detection for pinball balls against static table geometry.
//!
//! A table is described as a slice of [`Primitive`]s. Build an [`Index`] over it once,
//! then each physics sub-step ask [`narrowphase`] for the earliest collision of every ball
//! and apply the response.

/// Open a tracy profiling span that lasts until the returned guard is dropped.
/// Does nothing unless the `tracy` feature is enabled and a profiler is connected.
macro_rules! tracy_span {
    ($name:literal, $fn_name:literal) => {
        tracy_client::Client::running()
            .map(|client| client.span(tracy_client::span_location!($name), 0))
    };
}

pub mod config;
pub use config::{CollisionConfig, ConfigError, IndexKind, PhysicsSettings};

pub mod math;
pub use math::{uv, Unit, Vec2, Vec3};

pub mod physics;
pub use physics::{
    ball::{Ball, BallId},
    collision::{
        self,
        event::{CollisionEvent, EventSink, HitEvent, HitEventKind, NoneSink},
        kdtree::{KdTree, KdTreeParams},
        narrowphase,
        primitive::{
            HitProps, ItemHandle, Material, Primitive, PrimitiveKey, Response, Shape, Slingshot,
        },
        quadtree::{QuadTree, QuadTreeParams},
        spatialindex::{Index, SpatialIndex},
        BoundingBox, ResponseContext,
    },
    forcefield::{self, ForceField},
};
