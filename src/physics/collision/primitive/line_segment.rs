use super::{trigger_plane_time, Hit, HitProps, Response};
use crate::{
    math::{left_normal, right_normal, xy, Vec2, Vec3},
    physics::{ball::Ball, collision::BoundingBox, constants::*},
};

/// Extra kick given by a slingshot wall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slingshot {
    /// Speed added at the middle of the segment.
    pub force: f32,
    /// Minimum impact normal speed that fires the slingshot.
    pub threshold: f32,
}

/// A vertical wall between two points in the XY plane,
/// only solid from the left side of `v1 -> v2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    pub v1: Vec2,
    pub v2: Vec2,
    pub z_low: f32,
    pub z_high: f32,
    pub slingshot: Option<Slingshot>,
    normal: Vec2,
    length: f32,
}

impl LineSegment {
    pub fn new(v1: Vec2, v2: Vec2, z_low: f32, z_high: f32) -> Self {
        let d = v2 - v1;
        let length = d.mag();
        let normal = if length > 0.0 {
            left_normal(d) / length
        } else {
            Vec2::zero()
        };
        Self {
            v1,
            v2,
            z_low,
            z_high,
            slingshot: None,
            normal,
            length,
        }
    }

    pub fn with_slingshot(mut self, slingshot: Slingshot) -> Self {
        self.slingshot = Some(slingshot);
        self
    }

    #[inline]
    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            Vec3::new(self.v1.x.min(self.v2.x), self.v1.y.min(self.v2.y), self.z_low),
            Vec3::new(self.v1.x.max(self.v2.x), self.v1.y.max(self.v2.y), self.z_high),
        )
    }

    pub(super) fn hit_test(&self, props: &HitProps, ball: &Ball, dtime: f32) -> Option<Hit> {
        if self.length <= 0.0 {
            return None;
        }
        let rigid = props.response == Response::Rigid;
        let n = self.normal;
        let pos = xy(ball.pos);
        let vel = xy(ball.vel);
        let r = ball.radius;

        let bnv = vel.dot(n);
        let mut unhit = bnv > C_LOWNORMVEL;
        if rigid && unhit {
            // walls are one-sided
            return None;
        }

        let bcpd = (pos - self.v1).dot(n);
        let bnd = bcpd - r;

        let t = if rigid {
            if bnd < -r || bcpd < 0.0 {
                return None;
            }
            if bnd <= PHYS_TOUCH {
                // touching or embedded, resolved right away; slow ones are rest contacts
                0.0
            } else if bnv.abs() > C_LOWNORMVEL {
                bnd / -bnv
            } else {
                return None;
            }
        } else {
            let (t, leaving) = trigger_plane_time(props, ball, bnd, bnv)?;
            unhit = leaving;
            t
        };

        if !super::in_window(t, dtime) {
            return None;
        }

        // along the wall from v1
        let tangent = right_normal(n);
        let btd = (pos - self.v1).dot(tangent) + vel.dot(tangent) * t;
        if btd < -C_TOL_ENDPNTS || btd > self.length + C_TOL_ENDPNTS {
            return None;
        }

        // rolling point of the ball
        let hit_z = ball.pos.z - r + ball.vel.z * t;
        if hit_z + 1.5 * r < self.z_low || hit_z + 0.5 * r > self.z_high {
            return None;
        }

        let mut hit = Hit::new(t, Vec3::new(n.x, n.y, 0.0), bnd);
        hit.unhit = unhit;
        if rigid && bnv.abs() <= C_CONTACTVEL && bnd.abs() <= PHYS_TOUCH {
            hit.contact = Some(bnv);
        }
        Some(hit)
    }

    /// Push the ball into the wall so the bounce sends it back out faster.
    /// Returns whether the impact was hard enough to fire.
    pub(super) fn apply_slingshot(
        &self,
        sling: &Slingshot,
        ball: &mut Ball,
        normal: Vec3,
        dot: f32,
    ) -> bool {
        if dot > -sling.threshold {
            return false;
        }
        let n = xy(normal);
        let tangent = right_normal(n);
        let len = (self.v2 - self.v1).dot(tangent);
        let hit_point = xy(ball.pos) - n * ball.radius;
        let btd = (hit_point - self.v1).dot(tangent);
        // -1 at v1, 1 at v2
        let f = if len.abs() > 1.0e-6 {
            2.0 * btd / len - 1.0
        } else {
            -1.0
        };
        let force = 0.5 * (1.0 - f * f) * sling.force;
        ball.vel -= normal * force;
        true
    }
}
