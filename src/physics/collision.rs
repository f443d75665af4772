//! Broad phase indexes and narrow phase hit tests between balls and table geometry.

mod aabb;
pub use aabb::BoundingBox;

pub mod event;
pub use event::{CollisionEvent, EventSink, HitEvent, HitEventKind};

pub mod kdtree;
pub mod narrowphase;
pub mod quadtree;

pub mod primitive;
pub use primitive::{Primitive, Shape};

pub mod spatialindex;
pub use spatialindex::{Index, SpatialIndex};

use crate::config::PhysicsSettings;

/// Everything `collide` needs besides the ball and the event.
///
/// Responses only ever mutate the ball, so anything else they produce
/// (item events, random numbers) goes through here.
pub struct ResponseContext<'a> {
    pub settings: &'a PhysicsSettings,
    pub rng: &'a mut dyn rand::RngCore,
    pub events: &'a mut dyn EventSink,
}

impl<'a> ResponseContext<'a> {
    pub fn new(
        settings: &'a PhysicsSettings,
        rng: &'a mut dyn rand::RngCore,
        events: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            settings,
            rng,
            events,
        }
    }
}
