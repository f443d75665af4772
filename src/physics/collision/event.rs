use super::primitive::ItemHandle;
use crate::{
    math::{Vec2, Vec3},
    physics::BallId,
};

/// Result of the narrow phase for one ball in one sub-step.
///
/// This is scratch space owned by the caller. Reset it (or let the driver reset it)
/// before querying for another ball or another sub-step; nothing is carried over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    pub ball: BallId,
    /// Slot in the primitive slice of the earliest hit so far, `None` if nothing was hit.
    pub primitive: Option<usize>,
    /// The ball is resting against the primitive rather than bouncing off it.
    pub is_contact: bool,
    pub hit_time: f32,
    /// Signed distance from the ball surface to the primitive at the start of the sub-step.
    pub hit_distance: f32,
    pub hit_normal: Vec3,
    /// Velocity of the surface for moving primitives. Zero for static geometry.
    pub hit_velocity: Vec2,
    /// Normal velocity when the contact was detected. Only meaningful if `is_contact`.
    pub hit_org_normal_velocity: f32,
    pub hit_moment_bit: bool,
    /// Side indicator for non-rigid primitives: `true` means the ball is leaving.
    pub hit_flag: bool,
}

impl CollisionEvent {
    pub fn new(ball: BallId) -> Self {
        Self {
            ball,
            primitive: None,
            is_contact: false,
            hit_time: 0.0,
            hit_distance: 0.0,
            hit_normal: Vec3::zero(),
            hit_velocity: Vec2::zero(),
            hit_org_normal_velocity: 0.0,
            hit_moment_bit: true,
            hit_flag: false,
        }
    }

    /// Forget any recorded hit and open a fresh time window of length `dtime`.
    pub fn reset(&mut self, dtime: f32) {
        self.clear();
        self.hit_time = dtime;
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.ball);
    }

    /// Copy the result of a better candidate over this one.
    pub fn set(&mut self, other: &Self) {
        *self = *other;
    }

    pub fn has_hit(&self) -> bool {
        self.primitive.is_some()
    }
}

//
// item events
//

/// Something that happened to the item owning a primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitEvent {
    pub item: ItemHandle,
    pub ball: BallId,
    pub kind: HitEventKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitEventKind {
    /// A wall was hit at least as hard as its threshold.
    Hit { speed: f32 },
    /// A slingshot fired.
    Slingshot,
    /// A ball entered a trigger volume.
    Enter,
    /// A ball left a trigger volume.
    Exit,
}

/// Receiver of item events raised by collision responses.
///
/// How the events get to the game is up to the implementor.
pub trait EventSink {
    fn push(&mut self, event: HitEvent);
}

impl EventSink for Vec<HitEvent> {
    fn push(&mut self, event: HitEvent) {
        Vec::push(self, event);
    }
}

/// Sink that throws every event away.
pub struct NoneSink;
impl EventSink for NoneSink {
    fn push(&mut self, _: HitEvent) {}
}
