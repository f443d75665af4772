//! The closed family of shapes balls can collide with.
//!
//! Every shape provides a bounding box, a time-of-impact test against a moving ball
//! and (through [`Primitive::collide`]) a response. Shape-specific math lives in
//! the submodules; everything shared by all shapes lives here.

use super::{
    event::{CollisionEvent, HitEvent, HitEventKind},
    BoundingBox, ResponseContext,
};
use crate::{
    math::{Vec2, Vec3},
    physics::{
        ball::Ball,
        constants::{EVENT_REPEAT_DIST_SQ, STATIC_TIME},
        forcefield::ForceField,
    },
};

mod circle;
mod line_3d;
mod line_segment;
mod line_z;
mod plane;
mod point;
mod polygon;

pub use circle::Circle;
pub use line_3d::Line3D;
pub use line_segment::{LineSegment, Slingshot};
pub use line_z::LineZ;
pub use plane::Plane;
pub use point::Point;
pub use polygon::{Polygon3D, Triangle};

/// Opaque reference to the game item a primitive belongs to.
///
/// Only used to address item events and to track trigger membership,
/// never to look anything up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemHandle(pub u32);

/// Identity of a primitive in the caller's storage.
/// Callers bump `version` on reindexing to detect stale handles; it is not checked here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PrimitiveKey {
    pub index: u32,
    pub version: u32,
}

/// How a surface responds to being hit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct Material {
    /// Coefficient of restitution.
    pub elasticity: f32,
    /// How quickly elasticity drops as the impact gets harder. Zero disables.
    pub elasticity_falloff: f32,
    pub friction: f32,
    /// Maximum random deflection in radians. Negative means the table-wide hard scatter.
    pub scatter_radians: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            elasticity: 0.3,
            elasticity_falloff: 0.0,
            friction: 0.3,
            scatter_radians: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Response {
    /// Balls bounce off.
    #[default]
    Rigid,
    /// Balls pass through and the owner gets enter/exit events.
    Trigger,
}

/// Properties shared by every shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitProps {
    pub bounds: BoundingBox,
    pub material: Material,
    pub enabled: bool,
    pub fire_events: bool,
    /// Minimum impact speed that raises a hit event.
    pub threshold: f32,
    pub owner: Option<ItemHandle>,
    pub key: PrimitiveKey,
    pub response: Response,
}

impl Default for HitProps {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::EMPTY,
            material: Material::default(),
            enabled: true,
            fire_events: false,
            threshold: 0.0,
            owner: None,
            key: PrimitiveKey::default(),
            response: Response::Rigid,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Shape {
    Point(Point),
    LineZ(LineZ),
    Line3D(Line3D),
    LineSegment(LineSegment),
    Circle(Circle),
    Polygon(Polygon3D),
    Triangle(Triangle),
    Plane(Plane),
}

/// A single collidable piece of table geometry.
#[derive(Clone, Debug)]
pub struct Primitive {
    pub props: HitProps,
    pub shape: Shape,
}

/// What a shape found, before it is written into a [`CollisionEvent`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Hit {
    pub time: f32,
    pub normal: Vec3,
    pub distance: f32,
    /// Normal velocity if this is a resting contact.
    pub contact: Option<f32>,
    /// Ball is leaving a trigger rather than entering.
    pub unhit: bool,
}

impl Hit {
    pub fn new(time: f32, normal: Vec3, distance: f32) -> Self {
        Self {
            time,
            normal,
            distance,
            contact: None,
            unhit: false,
        }
    }
}

/// Is `t` a usable time of impact for a sub-step of length `dtime`?
#[inline]
pub(crate) fn in_window(t: f32, dtime: f32) -> bool {
    t.is_finite() && t >= 0.0 && t <= dtime
}

/// Time of impact between a moving sphere and a fixed point, in whatever
/// dimensions `rel_pos` and `vel` live in (z is zeroed for vertical lines).
///
/// Returns `(time, surface distance, normal velocity, is_contact)`.
pub(crate) fn sphere_point_toi(
    rel_pos: Vec3,
    vel: Vec3,
    radius: f32,
    dtime: f32,
) -> Option<(f32, f32, f32, bool)> {
    use crate::physics::constants::{CENTER_EPSILON, C_CONTACTVEL, MIN_SPEED_SQ, PHYS_TOUCH};

    let dist_sq = rel_pos.mag_sq();
    let dist = dist_sq.sqrt();
    if dist <= CENTER_EPSILON {
        return None;
    }
    let b = rel_pos.dot(vel);
    let bnv = b / dist;
    if bnv > C_CONTACTVEL {
        // receding
        return None;
    }
    let bnd = dist - radius;

    let mut is_contact = false;
    let t = if bnd < PHYS_TOUCH {
        if bnv.abs() <= C_CONTACTVEL {
            is_contact = true;
            0.0
        } else {
            (-bnd / bnv).max(0.0)
        }
    } else {
        let a = vel.mag_sq();
        if a < MIN_SPEED_SQ {
            return None;
        }
        let (t1, t2) = crate::math::solve_quadratic(a, 2.0 * b, dist_sq - radius * radius)?;
        if t1 * t2 < 0.0 {
            t1.max(t2)
        } else {
            t1.min(t2)
        }
    };

    in_window(t, dtime).then_some((t, bnd, bnv, is_contact))
}

//
// construction
//

impl Primitive {
    pub fn new(shape: Shape) -> Self {
        let mut prim = Self {
            props: HitProps::default(),
            shape,
        };
        prim.calc_bounding_box();
        prim
    }

    pub fn point(p: Vec3) -> Self {
        Self::new(Shape::Point(Point::new(p)))
    }

    /// A vertical line at `xy` spanning `z_low..z_high`.
    pub fn line_z(xy: Vec2, z_low: f32, z_high: f32) -> Self {
        Self::new(Shape::LineZ(LineZ::new(xy, z_low, z_high)))
    }

    pub fn line_3d(v1: Vec3, v2: Vec3) -> Self {
        Self::new(Shape::Line3D(Line3D::new(v1, v2)))
    }

    /// A wall that is hit from the left side of the direction `v1 -> v2`.
    pub fn line_segment(v1: Vec2, v2: Vec2, z_low: f32, z_high: f32) -> Self {
        Self::new(Shape::LineSegment(LineSegment::new(v1, v2, z_low, z_high)))
    }

    /// A wall segment that kicks the ball back when hit harder than `threshold`.
    pub fn slingshot(
        v1: Vec2,
        v2: Vec2,
        z_low: f32,
        z_high: f32,
        force: f32,
        threshold: f32,
    ) -> Self {
        let seg = LineSegment::new(v1, v2, z_low, z_high).with_slingshot(Slingshot {
            force,
            threshold,
        });
        Self::new(Shape::LineSegment(seg))
    }

    pub fn circle(center: Vec2, radius: f32, z_low: f32, z_high: f32) -> Self {
        Self::new(Shape::Circle(Circle::new(center, radius, z_low, z_high)))
    }

    /// A planar polygon. Vertices in counter-clockwise order
    /// (seen from outside) make the normal face outwards.
    pub fn polygon(vertices: Vec<Vec3>) -> Self {
        Self::new(Shape::Polygon(Polygon3D::new(vertices)))
    }

    pub fn triangle(vertices: [Vec3; 3]) -> Self {
        Self::new(Shape::Triangle(Triangle::new(vertices)))
    }

    /// The infinite plane `normal · x = d`.
    pub fn plane(normal: Vec3, d: f32) -> Self {
        Self::new(Shape::Plane(Plane::new(normal, d)))
    }

    // builders

    pub fn with_material(mut self, material: Material) -> Self {
        self.props.material = material;
        self
    }

    pub fn with_owner(mut self, owner: ItemHandle) -> Self {
        self.props.owner = Some(owner);
        self
    }

    pub fn with_key(mut self, key: PrimitiveKey) -> Self {
        self.props.key = key;
        self
    }

    /// Raise hit events on the owner for impacts at least `threshold` fast.
    pub fn with_events(mut self, threshold: f32) -> Self {
        self.props.fire_events = true;
        self.props.threshold = threshold;
        self
    }

    /// Make this a trigger that tracks which balls are inside `owner`.
    pub fn as_trigger(mut self, owner: ItemHandle) -> Self {
        self.props.response = Response::Trigger;
        self.props.owner = Some(owner);
        self.props.fire_events = true;
        self
    }

    // setters

    pub fn set_material(&mut self, material: Material) {
        self.props.material = material;
    }

    pub fn set_elasticity(&mut self, elasticity: f32) {
        self.props.material.elasticity = elasticity;
    }

    pub fn set_elasticity_falloff(&mut self, falloff: f32) {
        self.props.material.elasticity_falloff = falloff;
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.props.material.friction = friction;
    }

    pub fn set_scatter(&mut self, scatter_radians: f32) {
        self.props.material.scatter_radians = scatter_radians;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.props.enabled = enabled;
    }

    pub fn set_fire_events(&mut self, fire_events: bool) {
        self.props.fire_events = fire_events;
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.props.threshold = threshold;
    }

    pub fn set_owner(&mut self, owner: Option<ItemHandle>) {
        self.props.owner = owner;
    }

    pub fn set_key(&mut self, key: PrimitiveKey) {
        self.props.key = key;
    }

    #[inline]
    pub fn bounds(&self) -> &BoundingBox {
        &self.props.bounds
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.props.enabled
    }
}

//
// collision protocol
//

impl Primitive {
    /// Recompute the cached bounding box from the current geometry.
    pub fn calc_bounding_box(&mut self) {
        self.props.bounds = match &self.shape {
            Shape::Point(s) => s.bounding_box(),
            Shape::LineZ(s) => s.bounding_box(),
            Shape::Line3D(s) => s.bounding_box(),
            Shape::LineSegment(s) => s.bounding_box(),
            Shape::Circle(s) => s.bounding_box(),
            Shape::Polygon(s) => s.bounding_box(),
            Shape::Triangle(s) => s.bounding_box(),
            Shape::Plane(s) => s.bounding_box(),
        };
    }

    /// Earliest time in `[0, dtime]` at which `ball` hits this primitive.
    ///
    /// On a hit, the time, normal, distance and contact/side flags are written
    /// into `event`. Other fields, including `event.primitive`, are left alone.
    pub fn hit_test(&self, ball: &Ball, dtime: f32, event: &mut CollisionEvent) -> Option<f32> {
        if !self.props.enabled || ball.frozen {
            return None;
        }
        let props = &self.props;
        let hit = match &self.shape {
            Shape::Point(s) => s.hit_test(ball, dtime),
            Shape::LineZ(s) => s.hit_test(ball, dtime),
            Shape::Line3D(s) => s.hit_test(ball, dtime),
            Shape::LineSegment(s) => s.hit_test(props, ball, dtime),
            Shape::Circle(s) => s.hit_test(props, ball, dtime),
            Shape::Polygon(s) => s.hit_test(props, ball, dtime),
            Shape::Triangle(s) => s.hit_test(props, ball, dtime),
            Shape::Plane(s) => s.hit_test(ball, dtime),
        }?;

        event.hit_time = hit.time;
        event.hit_normal = hit.normal;
        event.hit_distance = hit.distance;
        event.hit_velocity = Vec2::zero();
        event.is_contact = hit.contact.is_some();
        event.hit_org_normal_velocity = hit.contact.unwrap_or(0.0);
        event.hit_flag = hit.unhit;
        Some(hit.time)
    }

    /// Respond to a hit found by [`hit_test`][Self::hit_test]. Mutates only the ball.
    pub fn collide(&self, ball: &mut Ball, event: &CollisionEvent, ctx: &mut ResponseContext) {
        match self.props.response {
            Response::Rigid => self.collide_rigid(ball, event, ctx),
            Response::Trigger => self.collide_trigger(ball, event, ctx),
        }
    }

    /// Keep a ball resting on this primitive in place for one sub-step.
    pub fn contact(
        &self,
        ball: &mut Ball,
        event: &CollisionEvent,
        dtime: f32,
        field: &dyn ForceField,
    ) {
        if self.props.response != Response::Rigid {
            return;
        }
        let gravity = field.value_at(ball.pos);
        ball.handle_static_contact(
            event.hit_normal,
            event.hit_org_normal_velocity,
            self.props.material.friction,
            dtime,
            gravity,
        );
    }

    fn collide_rigid(&self, ball: &mut Ball, event: &CollisionEvent, ctx: &mut ResponseContext) {
        let normal = event.hit_normal;
        let dot = normal.dot(ball.vel);
        let mat = &self.props.material;

        // Some(fired) for slingshots, None for everything else
        let slingshot = match &self.shape {
            Shape::LineSegment(seg) => seg
                .slingshot
                .map(|sling| seg.apply_slingshot(&sling, ball, normal, dot)),
            _ => None,
        };

        ball.collide_3d_wall(
            normal,
            mat.elasticity,
            mat.elasticity_falloff,
            mat.friction,
            mat.scatter_radians,
            event.hit_distance,
            ctx,
        );
        if let Shape::Plane(plane) = &self.shape {
            plane.push_out(ball);
        }

        match slingshot {
            Some(true) => self.fire_hit_event(ball, HitEventKind::Slingshot, ctx),
            Some(false) => {}
            None if -dot >= self.props.threshold => {
                self.fire_hit_event(ball, HitEventKind::Hit { speed: -dot }, ctx)
            }
            None => {}
        }
    }

    /// Raise an event on the owner unless the ball hasn't moved
    /// noticeably since the last one.
    fn fire_hit_event(&self, ball: &mut Ball, kind: HitEventKind, ctx: &mut ResponseContext) {
        let Some(item) = self.props.owner else {
            return;
        };
        if !self.props.fire_events {
            return;
        }
        let moved = ball
            .last_event_pos
            .map_or(true, |p| (p - ball.pos).mag_sq() > EVENT_REPEAT_DIST_SQ);
        ball.last_event_pos = Some(ball.pos);
        if moved {
            ctx.events.push(HitEvent {
                item,
                ball: ball.id,
                kind,
            });
        }
    }

    fn collide_trigger(&self, ball: &mut Ball, event: &CollisionEvent, ctx: &mut ResponseContext) {
        let Some(item) = self.props.owner else {
            return;
        };
        let inside = ball.is_inside(item);
        // entering requires being outside, leaving requires being inside
        if event.hit_flag != inside {
            return;
        }

        // step past the boundary so the same crossing isn't found again
        ball.advance(STATIC_TIME);
        let kind = if inside {
            ball.leave_volume(item);
            HitEventKind::Exit
        } else {
            ball.enter_volume(item);
            HitEventKind::Enter
        };
        log::trace!("ball {:?} {:?} item {:?}", ball.id, kind, item);

        if self.props.fire_events {
            ctx.events.push(HitEvent {
                item,
                ball: ball.id,
                kind,
            });
        }
    }
}

/// Shared logic of the non-rigid branch for flat shapes (polygons and wall segments):
/// a ball already overlapping the surface only counts if its side disagrees
/// with its recorded membership.
///
/// `bnd` is the signed distance from the ball surface, `bnv` the normal velocity.
pub(crate) fn trigger_plane_time(
    props: &HitProps,
    ball: &Ball,
    bnd: f32,
    bnv: f32,
) -> Option<(f32, bool)> {
    use crate::physics::constants::C_LOWNORMVEL;

    let owner = props.owner?;
    if bnv * bnd >= 0.0 {
        // outside and receding or inside and approaching
        let inside = bnd <= 0.0;
        if bnd.abs() >= ball.radius * 0.5 || inside == ball.is_inside(owner) {
            return None;
        }
        Some((0.0, !inside))
    } else {
        Some((bnd / -bnv, bnv > C_LOWNORMVEL))
    }
}
