use super::{
    collision::{primitive::ItemHandle, ResponseContext},
    constants::*,
};
use crate::math::{Vec2, Vec3};

/// Identifies a ball in the caller's ball storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BallId(pub u32);

/// A ball moving over the table.
///
/// Position and velocity are advanced by the caller between collision checks;
/// this crate only changes them in response to collisions.
#[derive(Clone, Debug)]
pub struct Ball {
    pub id: BallId,
    pub pos: Vec3,
    pub vel: Vec3,
    pub radius: f32,
    pub mass: f32,
    pub angular_momentum: Vec3,
    pub angular_velocity: Vec3,
    /// Frozen balls neither move nor collide.
    pub frozen: bool,
    /// Slot of the primitive representing this ball in the index, if there is one.
    /// It is never tested against the ball itself.
    pub proxy: Option<usize>,
    /// Items of the trigger volumes this ball is currently inside.
    pub volume_items: Vec<ItemHandle>,
    /// Where the ball was when it last fired a wall hit event.
    pub last_event_pos: Option<Vec3>,
}

impl Ball {
    pub fn new(id: BallId, pos: Vec3, vel: Vec3, radius: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            radius,
            mass: 1.0,
            angular_momentum: Vec3::zero(),
            angular_velocity: Vec3::zero(),
            frozen: false,
            proxy: None,
            volume_items: Vec::new(),
            last_event_pos: None,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        1.0 / self.mass
    }

    /// Moment of inertia of a solid sphere.
    #[inline]
    pub fn inertia(&self) -> f32 {
        0.4 * self.mass * self.radius * self.radius
    }

    /// Sphere that contains everything the ball could touch during `dtime`,
    /// as `(center, radius²)`.
    pub fn hit_sphere(&self, dtime: f32) -> (Vec3, f32) {
        let r = self.radius + self.vel.mag() * dtime + PHYS_TOUCH;
        (self.pos, r * r)
    }

    /// Move in a straight line. Used to step past a trigger boundary;
    /// regular motion is the caller's job.
    pub fn advance(&mut self, dtime: f32) {
        self.pos += self.vel * dtime;
    }

    /// Velocity of a point on the ball relative to its centre.
    pub fn surface_velocity(&self, offset: Vec3) -> Vec3 {
        self.vel + self.angular_velocity.cross(offset)
    }

    /// Apply an impulse at a point on the surface, given as its angular part `rot`
    /// (offset × impulse) and its linear part.
    pub fn apply_surface_impulse(&mut self, rot: Vec3, impulse: Vec3) {
        self.vel += impulse * self.inv_mass();
        self.angular_momentum += rot;
        self.angular_velocity = self.angular_momentum / self.inertia();
    }

    //
    // trigger membership
    //

    pub fn is_inside(&self, item: ItemHandle) -> bool {
        self.volume_items.contains(&item)
    }

    /// Record entering a volume. Returns false if already inside.
    pub fn enter_volume(&mut self, item: ItemHandle) -> bool {
        if self.is_inside(item) {
            return false;
        }
        self.volume_items.push(item);
        true
    }

    /// Record leaving a volume. Returns false if the ball wasn't inside.
    pub fn leave_volume(&mut self, item: ItemHandle) -> bool {
        match self.volume_items.iter().position(|i| *i == item) {
            Some(idx) => {
                self.volume_items.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    //
    // response
    //

    /// Bounce off a static surface with the given unit `normal`.
    ///
    /// Corrects penetration, reflects the normal velocity with `elasticity`
    /// (reduced by `elasticity_falloff` for hard hits), applies a Coulomb friction
    /// impulse at the contact point and finally rotates the velocity by a random
    /// scatter angle. A negative `scatter` uses the table-wide hard scatter.
    #[allow(clippy::too_many_arguments)]
    pub fn collide_3d_wall(
        &mut self,
        normal: Vec3,
        elasticity: f32,
        elasticity_falloff: f32,
        friction: f32,
        scatter: f32,
        hit_distance: f32,
        ctx: &mut ResponseContext,
    ) {
        let mut dot = self.vel.dot(normal);
        if dot >= -C_LOWNORMVEL {
            if dot > C_LOWNORMVEL {
                // already moving away
                return;
            }
            if hit_distance < -C_EMBEDDED {
                // stuck in the wall, shoot it out
                dot = -C_EMBEDSHOT;
            } else {
                return;
            }
        }

        let mut hdist = -C_DISP_GAIN * hit_distance;
        if hdist > 1.0e-4 {
            if hdist > C_DISP_LIMIT {
                hdist = C_DISP_LIMIT;
            }
            self.pos += hdist * normal;
        }

        let reaction_impulse = self.mass * dot.abs();

        let elasticity = if elasticity_falloff > 0.0 {
            elasticity / (1.0 + elasticity_falloff * dot.abs() * ELASTICITY_FALLOFF_SCALE)
        } else {
            elasticity
        };
        dot *= -(1.0 + elasticity);
        self.vel += dot * normal;

        // friction
        let surf_p = -self.radius * normal;
        let surf_vel = self.surface_velocity(surf_p);
        let tangent = surf_vel - surf_vel.dot(normal) * normal;
        let tangent_sq = tangent.mag_sq();
        if tangent_sq > 1.0e-6 {
            let tangent = tangent / tangent_sq.sqrt();
            let vt = surf_vel.dot(tangent);
            let cross = surf_p.cross(tangent);
            let kt = self.inv_mass() + tangent.dot((cross / self.inertia()).cross(surf_p));
            let max_fric = friction * reaction_impulse;
            let jt = (-vt / kt).clamp(-max_fric, max_fric);
            if jt.is_finite() {
                self.apply_surface_impulse(jt * cross, jt * tangent);
            }
        }

        let mut scatter = if scatter < 0.0 {
            ctx.settings.hard_scatter
        } else {
            scatter
        };
        scatter *= ctx.settings.difficulty;
        if dot > SCATTER_MIN_SPEED && scatter > 1.0e-5 {
            use rand::Rng;
            let mut s: f32 = ctx.rng.gen_range(-1.0..=1.0);
            s *= (1.0 - s * s) * 2.59808 * scatter;
            let (sin, cos) = s.sin_cos();
            let v = Vec2::new(self.vel.x, self.vel.y);
            self.vel.x = v.x * cos - v.y * sin;
            self.vel.y = v.y * cos + v.x * sin;
        }
    }

    /// Keep a ball that rests on a surface from sinking into it,
    /// and slow down its sliding with dynamic friction.
    ///
    /// `gravity` is the acceleration at the ball's position.
    pub fn handle_static_contact(
        &mut self,
        normal: Vec3,
        org_normal_velocity: f32,
        friction: f32,
        dtime: f32,
        gravity: Vec3,
    ) {
        let normal_vel = self.vel.dot(normal);
        if normal_vel > C_CONTACTVEL {
            return;
        }

        // just enough to cancel what gravity adds this step
        let normal_dv = (-(gravity.dot(normal) * dtime + org_normal_velocity)).max(0.0);
        self.vel += normal_dv * normal;

        self.apply_friction(normal, dtime, friction, gravity);
    }

    fn apply_friction(&mut self, normal: Vec3, dtime: f32, friction: f32, gravity: Vec3) {
        let surf_p = -self.radius * normal;
        let surf_vel = self.surface_velocity(surf_p);
        let slip = surf_vel - surf_vel.dot(normal) * normal;
        let max_fric = friction * self.mass * -gravity.dot(normal);
        let slip_speed = slip.mag();
        if slip_speed < C_PRECISION || max_fric <= 0.0 {
            return;
        }

        let slip_dir = slip / slip_speed;
        let cross = surf_p.cross(slip_dir);
        let denom = self.inv_mass() + slip_dir.dot((cross / self.inertia()).cross(surf_p));
        let fric = (-slip_speed / denom).clamp(-max_fric * dtime, max_fric * dtime);
        if fric.is_finite() {
            self.apply_surface_impulse(fric * cross, fric * slip_dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PhysicsSettings, physics::collision::event::NoneSink};
    use rand::{rngs::StdRng, SeedableRng};

    fn with_ctx(f: impl FnOnce(&mut ResponseContext)) {
        let settings = PhysicsSettings::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut sink = NoneSink;
        let mut ctx = ResponseContext::new(&settings, &mut rng, &mut sink);
        f(&mut ctx);
    }

    #[test]
    fn head_on_bounce() {
        let mut ball = Ball::new(BallId(0), Vec3::zero(), Vec3::new(0.0, 0.0, -10.0), 1.0);
        with_ctx(|ctx| ball.collide_3d_wall(Vec3::unit_z(), 0.5, 0.0, 0.3, 0.0, 0.0, ctx));
        // no tangential motion means no friction or scatter
        assert!((ball.vel.z - 5.0).abs() < 0.001);
        assert!(ball.vel.x.abs() < 0.001 && ball.vel.y.abs() < 0.001);
        assert!(ball.angular_velocity.mag() < 0.001);
    }

    #[test]
    fn receding_ball_untouched() {
        let mut ball = Ball::new(BallId(0), Vec3::zero(), Vec3::new(1.0, 0.0, 2.0), 1.0);
        with_ctx(|ctx| ball.collide_3d_wall(Vec3::unit_z(), 1.0, 0.0, 0.3, 0.0, 0.0, ctx));
        assert_eq!(ball.vel, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn falloff_reduces_bounce() {
        let mut hard = Ball::new(BallId(0), Vec3::zero(), Vec3::new(0.0, 0.0, -20.0), 1.0);
        let mut soft = hard.clone();
        with_ctx(|ctx| {
            hard.collide_3d_wall(Vec3::unit_z(), 0.8, 0.0, 0.0, 0.0, 0.0, ctx);
            soft.collide_3d_wall(Vec3::unit_z(), 0.8, 1.0, 0.0, 0.0, 0.0, ctx);
        });
        assert!(soft.vel.z < hard.vel.z);
        assert!(soft.vel.z > 0.0);
    }

    #[test]
    fn friction_spins_sliding_ball() {
        let mut ball = Ball::new(BallId(0), Vec3::zero(), Vec3::new(5.0, 0.0, -5.0), 1.0);
        with_ctx(|ctx| ball.collide_3d_wall(Vec3::unit_z(), 0.5, 0.0, 0.5, 0.0, 0.0, ctx));
        // friction slows the slide and makes the ball roll forward (around +y)
        assert!(ball.vel.x < 5.0);
        assert!(ball.angular_velocity.y > 0.0);
        // Coulomb limit: the tangential impulse is at most friction * normal impulse
        assert!(5.0 - ball.vel.x <= 0.5 * 5.0 + 0.001);
    }

    #[test]
    fn embedded_ball_pushed_out() {
        let mut ball = Ball::new(BallId(0), Vec3::zero(), Vec3::zero(), 1.0);
        with_ctx(|ctx| ball.collide_3d_wall(Vec3::unit_z(), 0.0, 0.0, 0.0, 0.0, -0.2, ctx));
        assert!((ball.pos.z - 0.2 * C_DISP_GAIN).abs() < 0.001);
        assert!((ball.vel.z - C_EMBEDSHOT).abs() < 0.001);
    }

    #[test]
    fn scatter_keeps_speed() {
        let settings = PhysicsSettings {
            difficulty: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut sink = NoneSink;
        let mut ctx = ResponseContext::new(&settings, &mut rng, &mut sink);
        let mut ball = Ball::new(BallId(0), Vec3::zero(), Vec3::new(0.0, -10.0, 0.0), 1.0);
        ball.collide_3d_wall(Vec3::unit_y(), 1.0, 0.0, 0.0, 0.3, 0.0, &mut ctx);
        assert!((ball.vel.mag() - 10.0).abs() < 0.001);
        assert!(ball.vel.y > 0.0);
    }

    #[test]
    fn static_contact_cancels_gravity() {
        let gravity = Vec3::new(0.0, 0.0, -10.0);
        let dt = 0.01;
        let mut ball = Ball::new(BallId(0), Vec3::zero(), Vec3::new(0.0, 0.0, -0.1), 1.0);
        ball.handle_static_contact(Vec3::unit_z(), -0.1, 0.0, dt, gravity);
        // one step of gravity from here leaves the ball at rest
        ball.vel += gravity * dt;
        assert!(ball.vel.z.abs() < 0.001);
    }

    #[test]
    fn volume_membership() {
        let mut ball = Ball::new(BallId(0), Vec3::zero(), Vec3::zero(), 1.0);
        let item = ItemHandle(4);
        assert!(!ball.is_inside(item));
        assert!(ball.enter_volume(item));
        assert!(!ball.enter_volume(item));
        assert!(ball.is_inside(item));
        assert!(ball.leave_volume(item));
        assert!(!ball.leave_volume(item));
    }
}
