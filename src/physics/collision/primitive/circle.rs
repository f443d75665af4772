use super::{in_window, Hit, HitProps, Response};
use crate::{
    math::{solve_quadratic, Vec2, Vec3},
    physics::{ball::Ball, collision::BoundingBox, constants::*},
};

/// A vertical cylinder, e.g. a bumper or a round trigger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
    pub z_low: f32,
    pub z_high: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32, z_low: f32, z_high: f32) -> Self {
        Self {
            center,
            radius,
            z_low,
            z_high,
        }
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            Vec3::new(
                self.center.x - self.radius,
                self.center.y - self.radius,
                self.z_low,
            ),
            Vec3::new(
                self.center.x + self.radius,
                self.center.y + self.radius,
                self.z_high,
            ),
        )
    }

    pub(super) fn hit_test(&self, props: &HitProps, ball: &Ball, dtime: f32) -> Option<Hit> {
        let rigid = props.response == Response::Rigid;
        // rigid circles are hit by the ball's side, triggers by its centre
        let target_radius = if rigid {
            self.radius + ball.radius
        } else {
            self.radius
        };

        let dist = Vec3::new(ball.pos.x - self.center.x, ball.pos.y - self.center.y, 0.0);
        let vel = Vec3::new(ball.vel.x, ball.vel.y, 0.0);
        let dist_sq = dist.mag_sq();
        let bcdd = dist_sq.sqrt();
        if bcdd <= CENTER_EPSILON {
            return None;
        }
        let b = dist.dot(vel);
        let bnv = b / bcdd;
        if rigid && bnv > C_LOWNORMVEL {
            return None;
        }
        let bnd = bcdd - target_radius;
        let a = vel.mag_sq();

        let mut t = 0.0;
        let mut unhit = false;
        let mut is_contact = false;
        let membership_mismatch = !rigid
            && props
                .owner
                .map_or(false, |item| (bnd < 0.0) != ball.is_inside(item));

        if rigid && bnd < PHYS_TOUCH {
            if bnd < -ball.radius {
                return None;
            } else if bnv.abs() <= C_CONTACTVEL {
                is_contact = true;
            } else {
                t = (-bnd / bnv).max(0.0);
            }
        } else if membership_mismatch {
            // inside without being recorded, or recorded without being inside
            unhit = bnd > 0.0;
        } else {
            if (!rigid && bnd * bnv > 0.0) || a < MIN_SPEED_SQ {
                return None;
            }
            let (t1, t2) = solve_quadratic(a, 2.0 * b, dist_sq - target_radius * target_radius)?;
            unhit = t1 * t2 < 0.0;
            t = if unhit { t1.max(t2) } else { t1.min(t2) };
        }

        if !in_window(t, dtime) {
            return None;
        }

        let hit_z = ball.pos.z + ball.vel.z * t;
        if hit_z + 0.5 * ball.radius < self.z_low || hit_z - 0.5 * ball.radius > self.z_high {
            return None;
        }

        let hit_xy = dist + t * vel;
        let len_sq = hit_xy.mag_sq();
        let normal = if len_sq > MIN_SPEED_SQ {
            hit_xy / len_sq.sqrt()
        } else {
            Vec3::unit_y()
        };

        let mut hit = Hit::new(t, normal, bnd);
        if !rigid {
            hit.unhit = unhit;
        }
        if is_contact {
            hit.contact = Some(bnv);
        }
        Some(hit)
    }
}
